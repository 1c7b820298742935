//! Key agreement and derivation.
//!
//! Both sides run X25519 over their ephemeral keys, then HKDF-SHA256 with an
//! 8-byte all-zero salt and the info string
//! `ALGORITHM|base64(creator key)|base64(joiner key)`. The first expansion
//! (32 bytes) keys the channel cipher, a second 5-byte expansion over the same
//! info yields the human-comparable check code.
//!
//! The creator's key always comes first in the info string, so the creator
//! passes `(local, peer)` and the joiner `(peer, local)`.

use std::fmt;

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::encoding;
use crate::{RendezvousAlgorithm, RendezvousError};

/// HKDF salt: eight zero bytes.
const HKDF_SALT: [u8; 8] = [0u8; 8];

/// Length of a raw X25519 public key.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Length of the derived channel key (full SHA-256 digest).
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Length of the check code derivation output.
pub const CHECK_CODE_SIZE: usize = 5;

/// Derived AES-256 key, wiped on drop.
pub type SymmetricKey = Zeroizing<[u8; SYMMETRIC_KEY_SIZE]>;

/// An ephemeral X25519 key pair, generated per create/join.
///
/// The secret is zeroized when the pair is dropped.
#[derive(Clone)]
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a fresh key pair from the OS random source.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    #[cfg(test)]
    fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// The public half, base64-encoded for `algorithm`.
    pub fn encoded_public_key(&self, algorithm: RendezvousAlgorithm) -> String {
        encoding::encode(algorithm, self.public.as_bytes())
    }

    /// Run X25519 against `peer` and return the raw shared secret.
    ///
    /// Fails if the peer key is a low-order point (the result would not
    /// depend on our secret).
    pub fn agree(&self, peer: &PublicKey) -> Result<Zeroizing<[u8; 32]>, RendezvousError> {
        let shared = self.secret.diffie_hellman(peer);
        if !shared.was_contributory() {
            return Err(RendezvousError::Internal(
                "key agreement produced a non-contributory secret".to_string(),
            ));
        }
        Ok(Zeroizing::new(shared.to_bytes()))
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &self.public.as_bytes())
            .finish_non_exhaustive()
    }
}

/// Parse a base64 public key as sent by the peer.
pub fn decode_public_key(encoded: &str) -> Result<PublicKey, RendezvousError> {
    let bytes = encoding::decode(encoded).map_err(|_| RendezvousError::InvalidInterlocutorKey)?;
    let raw: [u8; PUBLIC_KEY_SIZE] = bytes
        .try_into()
        .map_err(|_| RendezvousError::InvalidInterlocutorKey)?;
    Ok(PublicKey::from(raw))
}

/// Build `ALGORITHM|creator|joiner` with keys encoded per `algorithm`.
pub fn shared_info(
    algorithm: RendezvousAlgorithm,
    creator_key: &PublicKey,
    joiner_key: &PublicKey,
) -> String {
    format!(
        "{}|{}|{}",
        algorithm.as_str(),
        encoding::encode(algorithm, creator_key.as_bytes()),
        encoding::encode(algorithm, joiner_key.as_bytes()),
    )
}

/// Derive the channel key from a raw shared secret.
pub fn derive_symmetric_key(
    shared_secret: &[u8],
    shared_info: &str,
) -> Result<SymmetricKey, RendezvousError> {
    let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_SIZE]);
    expand(shared_secret, shared_info, &mut key[..])?;
    Ok(key)
}

/// Derive the check code from a raw shared secret.
pub fn derive_verification_code(
    shared_secret: &[u8],
    shared_info: &str,
) -> Result<VerificationCode, RendezvousError> {
    let mut bytes = [0u8; CHECK_CODE_SIZE];
    expand(shared_secret, shared_info, &mut bytes)?;
    Ok(VerificationCode::from_bytes(bytes))
}

fn expand(shared_secret: &[u8], shared_info: &str, out: &mut [u8]) -> Result<(), RendezvousError> {
    Hkdf::<Sha256>::new(Some(&HKDF_SALT), shared_secret)
        .expand(shared_info.as_bytes(), out)
        .map_err(|e| RendezvousError::Internal(format!("key derivation failed: {e}")))
}

/// Three-group decimal code both users compare out of band.
///
/// Each group is a 13-bit slice of the 5 derived bytes offset by 1000.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VerificationCode {
    groups: [u16; 3],
}

impl VerificationCode {
    /// Pack 5 derived bytes into the three groups.
    ///
    /// The third group takes only the low 6 bits of `b[3]`; other clients do
    /// the same, so this must not be "corrected".
    pub fn from_bytes(b: [u8; CHECK_CODE_SIZE]) -> Self {
        let [b0, b1, b2, b3, b4] = b.map(u16::from);
        let first = (b0 << 5 | b1 >> 3) + 1000;
        let second = ((b1 & 0x7) << 10 | (b2 << 2 | b3 >> 6)) + 1000;
        let third = ((b3 & 0x3f) << 7 | b4 >> 1) + 1000;
        Self {
            groups: [first, second, third],
        }
    }

    /// The three numeric groups.
    pub fn groups(&self) -> [u16; 3] {
        self.groups
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [first, second, third] = self.groups;
        write!(f, "{first}-{second}-{third}")
    }
}
