//! Test utilities for the rendezvous channel.
//!
//! - An in-memory rendezvous server that behaves like an MSC3886 endpoint
//! - A transport talking to it, for driving [`crate::RendezvousService`]
//! - Fixtures and assertion helpers for handshake tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rendezvous_lib::test_utils::ChannelFixture;
//! use rendezvous_lib::RendezvousAlgorithm;
//!
//! let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
//! let (_, creator_code, joiner_code) = fixture.establish().await?;
//! assert_eq!(creator_code, joiner_code);
//!
//! fixture.creator.send(b"hello").await?;
//! assert_eq!(fixture.joiner.receive().await?, b"hello");
//! ```

mod assertions;
mod fixtures;
mod mock_server;

pub use fixtures::{random_public_key, ChannelFixture, TestFixtures};

pub use mock_server::{
    MemoryRendezvousTransport, MockRendezvousServer, RecordedRequest, RequestMethod,
    DEFAULT_BASE_URL, FIRST_RESOURCE_ID,
};

pub use assertions::{assert_channel_established, assert_code_format, assert_not_ready};
