//! Cryptographic primitives for UPass.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 passphrase key derivation (`kdf`)
//! - Zeroizing derived-key material (`keys`)
//! - PKCS#7 padding (`padding`)
//! - The `{iv, ciphertext}` envelope: AES-256-CBC, or AES-256-GCM as v2 (`envelope`)

mod encoding;
pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod padding;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt_json, decrypt_json, derive_key, ...};
pub use envelope::{
    decrypt, decrypt_json, encrypt, encrypt_json, encrypt_with, Envelope, EnvelopeVersion,
};
pub use kdf::{derive_key, derive_key_with_salt, generate_salt, KdfParams, KdfVersion};
pub use keys::DerivedKey;
