//! Rendezvous transports.
//!
//! The [`RendezvousTransport`] trait is the only thing the service depends on.
//! [`HttpRendezvousTransport`] speaks MSC3886 over HTTP; tests use the
//! in-memory transport from [`crate::test_utils`].

mod config;
#[cfg(feature = "http-transport")]
mod http;
mod traits;

pub use config::{
    config_from_env, HttpTransportConfig, ENV_POLL_INTERVAL_MS, ENV_SERVER_URL, ENV_TIMEOUT_SECS,
};
#[cfg(feature = "http-transport")]
pub use http::HttpRendezvousTransport;
pub use traits::RendezvousTransport;
