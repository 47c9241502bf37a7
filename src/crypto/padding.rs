//! PKCS#7 block padding.
//!
//! `pad` always appends between 1 and `BLOCK_SIZE` bytes, so input that
//! is already block-aligned gains a whole block.  `unpad` checks every
//! pad byte, not just the last one.

use crate::errors::{Result, UpassError};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Append PKCS#7 padding to `data`.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    // pad_len is in 1..=16, so the cast is lossless.
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

/// Strip PKCS#7 padding, failing on anything malformed.
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(UpassError::DecryptionFailed);
    }

    let pad_len = usize::from(data[data.len() - 1]);
    if pad_len == 0 || pad_len > BLOCK_SIZE {
        return Err(UpassError::DecryptionFailed);
    }

    let (body, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| usize::from(b) != pad_len) {
        return Err(UpassError::DecryptionFailed);
    }

    Ok(body)
}
