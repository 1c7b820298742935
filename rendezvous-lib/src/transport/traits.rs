use async_trait::async_trait;
use serde::Serialize;

use crate::TransportResult;

/// Moves opaque payloads between the two parties through a server-side
/// rendezvous resource.
///
/// Implementations own the resource URL and the current cache validator
/// (ETag). Both are only mutated after a successful response, so dropping a
/// pending future leaves the transport as it was.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RendezvousTransport {
    /// URL of the rendezvous resource, once assigned.
    fn rendezvous_url(&self) -> Option<&str>;

    /// Create a new rendezvous holding `body` and remember its URL.
    async fn create<T>(&mut self, body: &T) -> TransportResult<()>
    where
        T: Serialize + Sync + ?Sized;

    /// Wait for a payload newer than the last one seen and return it.
    ///
    /// Polls until the resource changes; only returns early on failure. Drop
    /// the future to stop waiting.
    async fn get(&mut self) -> TransportResult<Vec<u8>>;

    /// Replace the payload at the rendezvous with `body`.
    async fn send<T>(&mut self, body: &T) -> TransportResult<()>
    where
        T: Serialize + Sync + ?Sized;

    /// Delete the rendezvous and forget its URL.
    async fn tear_down(&mut self) -> TransportResult<()>;
}
