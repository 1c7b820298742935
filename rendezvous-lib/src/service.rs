//! The MSC3903 secure channel on top of a [`RendezvousTransport`].
//!
//! # Flow
//!
//! ```text
//! creator                                   joiner
//! create_rendezvous()  ── POST {alg} ──▶
//!   share invite {transport, alg, key_C} ─────────────▶
//!                      ◀── PUT {alg, key_J} ──          join_rendezvous(key_C)
//! wait_for_interlocutor()
//!   both display the same check code, users compare
//! send()/receive()     ◀────── {iv, ciphertext} ──────▶ send()/receive()
//! tear_down()
//! ```
//!
//! The channel key and the check code are derived from
//! `ALGORITHM|creator key|joiner key` on both sides, see
//! [`crate::crypto::derivation`].

use std::fmt;

use x25519_dalek::PublicKey;

use crate::crypto::derivation::{self, EphemeralKeyPair, SymmetricKey, VerificationCode};
use crate::crypto::ChannelCipher;
use crate::{
    RendezvousAlgorithm, RendezvousDetails, RendezvousError, RendezvousMessage,
    RendezvousTransport, Result, TransportDetails, TransportError,
};

/// Where a [`RendezvousService`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Nothing created or joined yet.
    Idle,
    /// Rendezvous created; waiting for the joiner's key.
    AwaitingPeer,
    /// Keys agreed; `send`/`receive` available.
    Established,
    /// Rendezvous deleted and key material dropped.
    TornDown,
}

impl fmt::Display for ChannelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::AwaitingPeer => "awaiting-peer",
            Self::Established => "established",
            Self::TornDown => "torn-down",
        };
        f.write_str(label)
    }
}

enum ChannelState {
    Idle,
    AwaitingPeer {
        local: EphemeralKeyPair,
    },
    Established {
        local: EphemeralKeyPair,
        interlocutor: PublicKey,
        symmetric_key: SymmetricKey,
    },
    TornDown,
}

impl ChannelState {
    fn phase(&self) -> ChannelPhase {
        match self {
            Self::Idle => ChannelPhase::Idle,
            Self::AwaitingPeer { .. } => ChannelPhase::AwaitingPeer,
            Self::Established { .. } => ChannelPhase::Established,
            Self::TornDown => ChannelPhase::TornDown,
        }
    }
}

/// Performs the ECDH handshake over a transport and then exchanges
/// AES-GCM sealed payloads.
///
/// Create one service (with its own transport) per rendezvous attempt.
///
/// # Example
///
/// ```rust,ignore
/// use rendezvous_lib::{RendezvousAlgorithm, RendezvousService};
/// use rendezvous_lib::transport::{HttpRendezvousTransport, HttpTransportConfig};
///
/// let transport = HttpRendezvousTransport::new(HttpTransportConfig::new(server))?;
/// let mut service = RendezvousService::new(transport, RendezvousAlgorithm::V2);
///
/// let details = service.create_rendezvous().await?;
/// // ...hand `details` to the other device...
/// let code = service.wait_for_interlocutor().await?;
/// println!("Check code: {code}");
///
/// service.send(b"hello").await?;
/// let reply = service.receive().await?;
/// service.tear_down().await?;
/// ```
pub struct RendezvousService<T> {
    transport: T,
    algorithm: RendezvousAlgorithm,
    state: ChannelState,
}

impl<T: RendezvousTransport> RendezvousService<T> {
    /// Create an idle service over `transport`.
    pub fn new(transport: T, algorithm: RendezvousAlgorithm) -> Self {
        Self {
            transport,
            algorithm,
            state: ChannelState::Idle,
        }
    }

    /// The algorithm fixed at construction.
    pub fn algorithm(&self) -> RendezvousAlgorithm {
        self.algorithm
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ChannelPhase {
        self.state.phase()
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Our public key for the current attempt, encoded for the wire.
    pub fn public_key(&self) -> Option<String> {
        match &self.state {
            ChannelState::AwaitingPeer { local } | ChannelState::Established { local, .. } => {
                Some(local.encoded_public_key(self.algorithm))
            }
            ChannelState::Idle | ChannelState::TornDown => None,
        }
    }

    /// The peer's public key once the channel is established.
    pub fn interlocutor_public_key(&self) -> Option<String> {
        match &self.state {
            ChannelState::Established { interlocutor, .. } => Some(
                crate::crypto::encoding::encode(self.algorithm, interlocutor.as_bytes()),
            ),
            _ => None,
        }
    }

    /// Channel key, for tests comparing both ends of a handshake.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn symmetric_key(&self) -> Option<&[u8; derivation::SYMMETRIC_KEY_SIZE]> {
        match &self.state {
            ChannelState::Established { symmetric_key, .. } => Some(&**symmetric_key),
            _ => None,
        }
    }

    /// Create a rendezvous as the initiating device.
    ///
    /// Publishes only the algorithm, then returns the full details to hand
    /// to the other device: transport location plus our public key.
    ///
    /// Only an idle service can create; otherwise `ChannelNotReady`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), fields(algorithm = %self.algorithm)))]
    pub async fn create_rendezvous(&mut self) -> Result<RendezvousDetails> {
        self.ensure_idle()?;
        let local = EphemeralKeyPair::generate();

        self.transport
            .create(&RendezvousDetails::new(self.algorithm))
            .await?;

        let uri = self
            .transport
            .rendezvous_url()
            .ok_or(TransportError::RendezvousUrlInvalid)?
            .to_string();

        let details = RendezvousDetails::new(self.algorithm)
            .with_transport(TransportDetails::http(uri))
            .with_key(local.encoded_public_key(self.algorithm));

        self.state = ChannelState::AwaitingPeer { local };
        Ok(details)
    }

    /// Wait for the joiner's public key and derive the channel.
    ///
    /// Returns the check code to show the user.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn wait_for_interlocutor(&mut self) -> Result<VerificationCode> {
        if !matches!(self.state, ChannelState::AwaitingPeer { .. }) {
            return Err(RendezvousError::ChannelNotReady);
        }

        let data = self.transport.get().await?;
        let details: RendezvousDetails = serde_json::from_slice(&data)?;

        let encoded = details
            .key
            .as_deref()
            .ok_or(RendezvousError::InvalidInterlocutorKey)?;
        let interlocutor = derivation::decode_public_key(encoded)?;

        let ChannelState::AwaitingPeer { local } = &self.state else {
            return Err(RendezvousError::ChannelNotReady);
        };
        let local = local.clone();

        let (symmetric_key, code) =
            self.derive(&local, local.public_key(), &interlocutor, &interlocutor)?;

        #[cfg(feature = "tracing")]
        tracing::info!("secure channel established as creator");

        self.state = ChannelState::Established {
            local,
            interlocutor,
            symmetric_key,
        };
        Ok(code)
    }

    /// Join a rendezvous created by another device whose public key is
    /// `public_key` (base64, padded or not).
    ///
    /// The transport must already point at the creator's rendezvous.
    /// Returns the check code to show the user. Only an idle service can
    /// join; otherwise `ChannelNotReady`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, public_key), fields(algorithm = %self.algorithm)))]
    pub async fn join_rendezvous(&mut self, public_key: &str) -> Result<VerificationCode> {
        self.ensure_idle()?;
        let interlocutor = derivation::decode_public_key(public_key)?;
        let local = EphemeralKeyPair::generate();

        // Creator's key goes first in the derivation info
        let (symmetric_key, code) =
            self.derive(&local, &interlocutor, local.public_key(), &interlocutor)?;

        let details =
            RendezvousDetails::new(self.algorithm).with_key(local.encoded_public_key(self.algorithm));
        self.transport.send(&details).await?;

        #[cfg(feature = "tracing")]
        tracing::info!("secure channel established as joiner");

        self.state = ChannelState::Established {
            local,
            interlocutor,
            symmetric_key,
        };
        Ok(code)
    }

    /// Encrypt `data` and post it to the peer.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, data), fields(data_len = data.len())))]
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let message = self.cipher()?.seal(data)?;
        self.transport.send(&message).await?;
        Ok(())
    }

    /// Wait for the peer's next payload and decrypt it.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;

        let data = self.transport.get().await?;
        let message: RendezvousMessage = serde_json::from_slice(&data)?;
        cipher.open(&message)
    }

    /// Delete the rendezvous and drop all key material.
    ///
    /// On failure the service keeps its current state so the call can be
    /// repeated.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn tear_down(&mut self) -> Result<()> {
        self.transport.tear_down().await?;
        self.state = ChannelState::TornDown;
        Ok(())
    }

    /// A service drives one attempt; a torn-down one does not start another.
    fn ensure_idle(&self) -> Result<()> {
        if matches!(self.state, ChannelState::Idle) {
            Ok(())
        } else {
            Err(RendezvousError::ChannelNotReady)
        }
    }

    fn cipher(&self) -> Result<ChannelCipher> {
        match &self.state {
            ChannelState::Established { symmetric_key, .. } => {
                ChannelCipher::new(symmetric_key, self.algorithm)
            }
            _ => Err(RendezvousError::ChannelNotReady),
        }
    }

    /// ECDH with `interlocutor`, then derive key and check code over
    /// `ALGORITHM|creator|joiner`.
    fn derive(
        &self,
        local: &EphemeralKeyPair,
        creator: &PublicKey,
        joiner: &PublicKey,
        interlocutor: &PublicKey,
    ) -> Result<(SymmetricKey, VerificationCode)> {
        let shared_secret = local.agree(interlocutor)?;
        let info = derivation::shared_info(self.algorithm, creator, joiner);

        let symmetric_key = derivation::derive_symmetric_key(&shared_secret[..], &info)?;
        let code = derivation::derive_verification_code(&shared_secret[..], &info)?;
        Ok((symmetric_key, code))
    }
}

impl<T> fmt::Debug for RendezvousService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendezvousService")
            .field("algorithm", &self.algorithm)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}
