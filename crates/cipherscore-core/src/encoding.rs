//! Plaintext score encoding.
//!
//! A revealed score travels as one 32-byte big-endian word. Scores are `u64`,
//! so the upper 24 bytes of a well-formed word are zero.

use crate::error::{CoreError, Result};

/// Width of an encoded plaintext word.
pub const WORD_LEN: usize = 32;

const VALUE_OFFSET: usize = WORD_LEN - 8;

/// Encode a score as a 32-byte big-endian word.
pub fn encode_score(value: u64) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[VALUE_OFFSET..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Decode a 32-byte big-endian word into a score.
///
/// Fails if the input is not exactly one word or if the value does not fit
/// in a `u64`.
pub fn decode_score(bytes: &[u8]) -> Result<u64> {
    if bytes.len() != WORD_LEN {
        return Err(CoreError::MalformedEncoding(format!(
            "expected {} bytes, got {}",
            WORD_LEN,
            bytes.len()
        )));
    }

    if bytes[..VALUE_OFFSET].iter().any(|&b| b != 0) {
        return Err(CoreError::MalformedEncoding(
            "value does not fit in 64 bits".into(),
        ));
    }

    let mut value = [0u8; 8];
    value.copy_from_slice(&bytes[VALUE_OFFSET..]);
    Ok(u64::from_be_bytes(value))
}
