//! Base64 handling for keys and message fields.
//!
//! Output follows the algorithm version; input is accepted with or without
//! padding regardless of version, since peers on either side of an upgrade
//! may send both.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, STANDARD_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::RendezvousAlgorithm;

/// Standard alphabet, padding optional on decode.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode `bytes` the way `algorithm` expects on the wire.
pub fn encode(algorithm: RendezvousAlgorithm, bytes: impl AsRef<[u8]>) -> String {
    if algorithm.uses_padding() {
        STANDARD.encode(bytes)
    } else {
        STANDARD_NO_PAD.encode(bytes)
    }
}

/// Decode padded or unpadded standard base64.
pub fn decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    LENIENT.decode(input.trim())
}
