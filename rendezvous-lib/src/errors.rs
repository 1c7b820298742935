//! Error types for rendezvous operations.
//!
//! Failures are split along the same line as the components: the transport
//! reports what happened on the wire, the service reports what went wrong with
//! the handshake or the secure channel and wraps transport failures verbatim.

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RendezvousErrorCode {
    /// No rendezvous URL has been assigned (not created yet, or torn down)
    RendezvousUrlInvalid = 2000,
    /// Payload could not be serialized
    Encoding = 2001,
    /// HTTP or connection failure
    Network = 2002,
    /// The rendezvous was removed server-side
    RendezvousCancelled = 2003,
    /// The peer's public key is missing or malformed
    InvalidInterlocutorKey = 3000,
    /// A received payload could not be decoded or authenticated
    Decoding = 3001,
    /// `send`/`receive` before the handshake completed
    ChannelNotReady = 3002,
    /// Cryptographic failure
    Internal = 9999,
}

/// Failures reported by a [`RendezvousTransport`](crate::RendezvousTransport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Operation attempted before creation or after teardown.
    #[error("rendezvous URL is not set or invalid")]
    RendezvousUrlInvalid,

    /// Request body could not be serialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// HTTP/transport failure, including missing expected headers.
    #[error("network error: {0}")]
    Network(String),

    /// The resource is gone: the other party cancelled or it expired.
    #[error("rendezvous was cancelled or has expired")]
    RendezvousCancelled,
}

/// Failures reported by the [`RendezvousService`](crate::RendezvousService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RendezvousError {
    /// Peer public key is missing, not base64, or not a curve25519 point.
    #[error("invalid interlocutor public key")]
    InvalidInterlocutorKey,

    /// Malformed JSON, base64 or AEAD envelope.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Key agreement, key derivation or sealing failed.
    #[error("internal error: {0}")]
    Internal(String),

    /// The secure channel has not been established (or was torn down).
    #[error("secure channel is not ready")]
    ChannelNotReady,

    /// Pass-through of a transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl TransportError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> RendezvousErrorCode {
        match self {
            Self::RendezvousUrlInvalid => RendezvousErrorCode::RendezvousUrlInvalid,
            Self::Encoding(_) => RendezvousErrorCode::Encoding,
            Self::Network(_) => RendezvousErrorCode::Network,
            Self::RendezvousCancelled => RendezvousErrorCode::RendezvousCancelled,
        }
    }

    /// Returns true if the rendezvous cannot recover and must be started afresh.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RendezvousCancelled)
    }

    /// Returns true if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl RendezvousError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> RendezvousErrorCode {
        match self {
            Self::InvalidInterlocutorKey => RendezvousErrorCode::InvalidInterlocutorKey,
            Self::Decoding(_) => RendezvousErrorCode::Decoding,
            Self::Internal(_) => RendezvousErrorCode::Internal,
            Self::ChannelNotReady => RendezvousErrorCode::ChannelNotReady,
            Self::Transport(err) => err.code(),
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if the rendezvous cannot recover and must be started afresh.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_terminal(),
            _ => false,
        }
    }

    /// Returns true if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for RendezvousError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}

impl From<base64::DecodeError> for RendezvousError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decoding(err.to_string())
    }
}
