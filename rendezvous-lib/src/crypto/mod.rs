//! Cryptographic building blocks of the MSC3903 secure channel.
//!
//! - [`encoding`]: algorithm-aware base64 (padded for V1, unpadded for V2)
//! - [`derivation`]: X25519 key pairs, HKDF-SHA256 key and check-code derivation
//! - [`cipher`]: AES-256-GCM with the protocol's 256-bit nonces

pub mod cipher;
pub mod derivation;
pub mod encoding;

pub use cipher::ChannelCipher;
pub use derivation::{EphemeralKeyPair, SymmetricKey, VerificationCode};
