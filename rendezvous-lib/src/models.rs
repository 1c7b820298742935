//! Wire formats exchanged over a rendezvous.
//!
//! Field names are wire-exact; absent optionals are omitted rather than sent
//! as `null`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transport type identifier for the simple HTTP rendezvous (MSC3886).
pub const HTTP_TRANSPORT_TYPE: &str = "org.matrix.msc3886.http.v1";

/// Secure channel algorithm (MSC3903).
///
/// The version governs how public keys and message fields are base64-encoded:
/// the legacy `V1` uses padded base64, `V2` uses unpadded base64.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RendezvousAlgorithm {
    /// Legacy identifier, padded base64.
    #[serde(rename = "org.matrix.msc3903.rendezvous.v1.curve25519-aes-sha256")]
    V1,
    /// Current identifier, unpadded base64.
    #[default]
    #[serde(rename = "org.matrix.msc3903.rendezvous.v2.curve25519-aes-sha256")]
    V2,
}

impl RendezvousAlgorithm {
    /// Wire identifier of the legacy algorithm.
    pub const V1_ID: &'static str = "org.matrix.msc3903.rendezvous.v1.curve25519-aes-sha256";

    /// Wire identifier of the current algorithm.
    pub const V2_ID: &'static str = "org.matrix.msc3903.rendezvous.v2.curve25519-aes-sha256";

    /// Get the wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => Self::V1_ID,
            Self::V2 => Self::V2_ID,
        }
    }

    /// Whether base64 output carries `=` padding.
    pub fn uses_padding(&self) -> bool {
        matches!(self, Self::V1)
    }
}

impl fmt::Display for RendezvousAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RendezvousAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::V1_ID => Ok(Self::V1),
            Self::V2_ID => Ok(Self::V2),
            other => Err(format!("unsupported rendezvous algorithm: {other}")),
        }
    }
}

/// Where the counterparty should poll and post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportDetails {
    /// Transport type, e.g. [`HTTP_TRANSPORT_TYPE`].
    #[serde(rename = "type")]
    pub transport_type: String,
    /// Absolute URL of the rendezvous resource.
    pub uri: String,
}

impl TransportDetails {
    /// Details for an MSC3886 HTTP rendezvous at `uri`.
    pub fn http(uri: impl Into<String>) -> Self {
        Self {
            transport_type: HTTP_TRANSPORT_TYPE.to_string(),
            uri: uri.into(),
        }
    }
}

/// Handshake payload: the algorithm plus (once known) transport and public key.
///
/// The creator first publishes only the algorithm; the details it hands to the
/// joiner carry the transport and its public key. The joiner answers with its
/// own public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendezvousDetails {
    /// Transport description, present only in the creator's invite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportDetails>,
    /// Algorithm identifier as sent on the wire.
    pub algorithm: String,
    /// Sender's raw X25519 public key, base64-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl RendezvousDetails {
    /// Details carrying only the algorithm.
    pub fn new(algorithm: RendezvousAlgorithm) -> Self {
        Self {
            transport: None,
            algorithm: algorithm.as_str().to_string(),
            key: None,
        }
    }

    /// Attach an encoded public key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach transport details.
    pub fn with_transport(mut self, transport: TransportDetails) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Parse the algorithm identifier, if it is one we know.
    pub fn algorithm(&self) -> Option<RendezvousAlgorithm> {
        self.algorithm.parse().ok()
    }
}

/// Encrypted application payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendezvousMessage {
    /// Base64 nonce (32 bytes once decoded).
    pub iv: String,
    /// Base64 of ciphertext with the 16-byte GCM tag appended.
    pub ciphertext: String,
}

/// The payload a creator shares with the joiner (as a QR code or link).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendezvousInvite {
    /// Full rendezvous details, including transport and the creator's key.
    pub rendezvous: RendezvousDetails,
    /// Matrix user ID of the creator.
    pub user: String,
}

impl RendezvousInvite {
    /// Bundle details for `user`.
    pub fn new(rendezvous: RendezvousDetails, user: impl Into<String>) -> Self {
        Self {
            rendezvous,
            user: user.into(),
        }
    }
}
