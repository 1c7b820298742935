//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use rendezvous_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Wire types: `RendezvousDetails`, `RendezvousMessage`, `RendezvousInvite`
//! - Error types: `RendezvousError`, `TransportError`, `Result`
//! - The channel: `RendezvousService`, `ChannelPhase`, `VerificationCode`
//! - Transports: `RendezvousTransport` and, by default, the HTTP implementation

// Wire types
pub use crate::models::{
    RendezvousAlgorithm, RendezvousDetails, RendezvousInvite, RendezvousMessage,
    TransportDetails,
};

// Error handling
pub use crate::errors::{RendezvousError, RendezvousErrorCode, TransportError};
pub use crate::{Result, TransportResult};

// Secure channel
pub use crate::crypto::VerificationCode;
pub use crate::service::{ChannelPhase, RendezvousService};

// Transports
pub use crate::transport::{HttpTransportConfig, RendezvousTransport};

#[cfg(feature = "http-transport")]
pub use crate::transport::HttpRendezvousTransport;
