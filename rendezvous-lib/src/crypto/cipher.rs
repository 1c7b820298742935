//! AES-256-GCM for the established channel.
//!
//! # Wire Format
//!
//! ```text
//! iv:         [32 bytes random nonce]
//! ciphertext: [N bytes ciphertext][16 bytes auth tag]
//! ```
//!
//! The nonce is 256 bits rather than the usual 96; GCM accepts any nonce
//! length by hashing it through GHASH, and peers expect exactly 32 bytes.

use aes_gcm::aead::consts::U32;
use aes_gcm::aead::{Aead, AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};

use super::derivation::SymmetricKey;
use super::encoding;
use crate::{RendezvousAlgorithm, RendezvousError, RendezvousMessage};

/// Size of the nonce in bytes.
pub const NONCE_SIZE: usize = 32;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

type Aes256Gcm32 = AesGcm<Aes256, U32>;

/// Seals and opens [`RendezvousMessage`]s under a derived channel key.
pub struct ChannelCipher {
    cipher: Aes256Gcm32,
    algorithm: RendezvousAlgorithm,
}

impl ChannelCipher {
    /// Create a cipher from the derived key.
    pub fn new(key: &SymmetricKey, algorithm: RendezvousAlgorithm) -> Result<Self, RendezvousError> {
        let cipher = Aes256Gcm32::new_from_slice(&key[..])
            .map_err(|e| RendezvousError::Internal(format!("invalid channel key: {e}")))?;
        Ok(Self { cipher, algorithm })
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<RendezvousMessage, RendezvousError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);
        self.seal_with_nonce(&nonce_bytes, plaintext)
    }

    fn seal_with_nonce(
        &self,
        nonce_bytes: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<RendezvousMessage, RendezvousError> {
        let nonce = Nonce::<U32>::from_slice(nonce_bytes);

        // Output is ciphertext with the tag appended
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| RendezvousError::Internal(format!("seal failed: {e}")))?;

        Ok(RendezvousMessage {
            iv: encoding::encode(self.algorithm, nonce_bytes),
            ciphertext: encoding::encode(self.algorithm, &sealed),
        })
    }

    /// Decrypt and authenticate a received message.
    pub fn open(&self, message: &RendezvousMessage) -> Result<Vec<u8>, RendezvousError> {
        let nonce_bytes = encoding::decode(&message.iv)?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(RendezvousError::Decoding(format!(
                "nonce must be {NONCE_SIZE} bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let sealed = encoding::decode(&message.ciphertext)?;
        if sealed.len() < TAG_SIZE {
            return Err(RendezvousError::Decoding(
                "ciphertext shorter than authentication tag".to_string(),
            ));
        }

        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);
        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::<U32>::from_slice(&nonce_bytes),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| RendezvousError::Decoding("authentication failed".to_string()))?;

        Ok(buffer)
    }
}
