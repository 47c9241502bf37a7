//! Derived key material.
//!
//! A `DerivedKey` is produced by the KDF for a single operation and
//! dropped (and zeroed) when that operation finishes.  It is never
//! cached between operations.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a derived key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte symmetric key that zeroes its memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to build a cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Lowercase hex form, as sent to the storage backend.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// SHA-256 of the key bytes.
    ///
    /// Lets a backend recognise the key it was provisioned with without
    /// holding the key itself.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(self.bytes).into()
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_leak_bytes() {
        let key = DerivedKey::new([0xAB; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "DerivedKey(..)");
    }

    #[test]
    fn hex_is_lowercase_and_full_length() {
        let key = DerivedKey::new([0xAB; KEY_LEN]);
        assert_eq!(key.to_hex(), "ab".repeat(KEY_LEN));
    }

    #[test]
    fn fingerprint_differs_per_key() {
        let a = DerivedKey::new([1; KEY_LEN]);
        let b = DerivedKey::new([2; KEY_LEN]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), DerivedKey::new([1; KEY_LEN]).fingerprint());
    }
}
