//! Secure rendezvous library.
//!
//! Lets two devices that share no prior trust set up an encrypted channel
//! through an untrusted HTTP relay, as used by Matrix "sign in with QR code":
//!
//! - **Transport** (MSC3886): a server-side resource both parties poll and
//!   overwrite, with ETag-based change detection
//! - **Secure channel** (MSC3903): X25519 key agreement, an HKDF-derived
//!   AES-256-GCM key and a short check code for users to compare out-of-band
//!
//! # Features
//!
//! - `http-transport` (default): reqwest-backed [`transport::HttpRendezvousTransport`]
//! - `tracing`: emit spans and events through `tracing`
//! - `test-utils`: in-memory server and transport for tests
//!
//! # Example
//!
//! ```ignore
//! use rendezvous_lib::{RendezvousAlgorithm, RendezvousService};
//! use rendezvous_lib::transport::{HttpRendezvousTransport, HttpTransportConfig};
//!
//! let config = HttpTransportConfig::new("https://rz.example.org/rendezvous");
//! let mut creator = RendezvousService::new(
//!     HttpRendezvousTransport::new(config)?,
//!     RendezvousAlgorithm::V2,
//! );
//!
//! let details = creator.create_rendezvous().await?;
//! // ...show `details` as a QR code...
//! let code = creator.wait_for_interlocutor().await?;
//! println!("Confirm the other device shows {code}");
//! ```

pub mod crypto;
pub mod errors;
pub mod models;
pub mod prelude;
pub mod service;
pub mod transport;

/// In-memory rendezvous server and transport.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crypto::VerificationCode;
pub use errors::{RendezvousError, RendezvousErrorCode, TransportError};
pub use models::{
    RendezvousAlgorithm, RendezvousDetails, RendezvousInvite, RendezvousMessage,
    TransportDetails, HTTP_TRANSPORT_TYPE,
};
pub use service::{ChannelPhase, RendezvousService};
pub use transport::RendezvousTransport;

/// Common result alias for channel operations.
pub type Result<T> = std::result::Result<T, RendezvousError>;

/// Result alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
