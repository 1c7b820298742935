//! Test fixtures and data generators.

use std::sync::Arc;

use super::{MemoryRendezvousTransport, MockRendezvousServer};
use crate::crypto::EphemeralKeyPair;
use crate::{
    RendezvousAlgorithm, RendezvousDetails, RendezvousService, Result, VerificationCode,
};

/// Commonly used test data.
pub struct TestFixtures;

impl TestFixtures {
    /// Public keys that are valid base64 but not 32 bytes long.
    pub const WRONG_LENGTH_KEYS: &'static [&'static str] = &[
        "",
        "AAAA",
        "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
    ];

    /// Strings that are not base64 at all.
    pub const NOT_BASE64: &'static [&'static str] = &["not a key", "!!!!", "ä"];

    /// Sample plaintexts, including the empty one.
    pub const SAMPLE_PAYLOADS: &'static [&'static [u8]] = &[
        b"",
        b"hello",
        br#"{"type":"m.login.protocols","protocols":["org.matrix.msc3906.login_token"]}"#,
    ];
}

/// A freshly generated public key encoded for `algorithm`.
pub fn random_public_key(algorithm: RendezvousAlgorithm) -> String {
    EphemeralKeyPair::generate().encoded_public_key(algorithm)
}

/// Creator and joiner services sharing one in-memory server.
pub struct ChannelFixture {
    pub server: Arc<MockRendezvousServer>,
    pub creator: RendezvousService<MemoryRendezvousTransport>,
    pub joiner: RendezvousService<MemoryRendezvousTransport>,
}

impl ChannelFixture {
    /// Two idle services using `algorithm`.
    pub fn new(algorithm: RendezvousAlgorithm) -> Self {
        let server = MockRendezvousServer::new();
        Self {
            creator: RendezvousService::new(
                MemoryRendezvousTransport::new(server.clone()),
                algorithm,
            ),
            joiner: RendezvousService::new(
                MemoryRendezvousTransport::new(server.clone()),
                algorithm,
            ),
            server,
        }
    }

    /// Run the full handshake.
    ///
    /// Returns the published details and the check codes shown on the
    /// creator and joiner, in that order.
    pub async fn establish(
        &mut self,
    ) -> Result<(RendezvousDetails, VerificationCode, VerificationCode)> {
        let details = self.creator.create_rendezvous().await?;
        self.point_joiner_at(&details);

        let key = details.key.clone().unwrap_or_default();
        let joiner_code = self.joiner.join_rendezvous(&key).await?;
        let creator_code = self.creator.wait_for_interlocutor().await?;
        Ok((details, creator_code, joiner_code))
    }

    /// Give the joiner's transport the creator's rendezvous URL, as scanning
    /// the invite would.
    pub fn point_joiner_at(&mut self, details: &RendezvousDetails) {
        let mut transport = MemoryRendezvousTransport::new(self.server.clone());
        transport.set_rendezvous_url(details.transport.as_ref().map(|t| t.uri.clone()));
        self.joiner = RendezvousService::new(transport, self.joiner.algorithm());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derivation::decode_public_key;

    #[test]
    fn test_invalid_keys_are_rejected() {
        for key in TestFixtures::WRONG_LENGTH_KEYS
            .iter()
            .chain(TestFixtures::NOT_BASE64)
        {
            assert!(decode_public_key(key).is_err(), "{key:?} should be rejected");
        }
    }

    #[test]
    fn test_random_public_key_decodes() {
        let key = random_public_key(RendezvousAlgorithm::V1);
        assert!(key.ends_with('='));
        assert!(decode_public_key(&key).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixture_establishes() {
        let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
        let (details, creator_code, joiner_code) = fixture.establish().await.unwrap();
        assert_eq!(creator_code, joiner_code);
        assert!(details.transport.is_some());
    }
}
