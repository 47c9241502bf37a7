//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! Two derivation versions exist:
//!
//! - **v1** uses an empty salt.  The same passphrase always yields the
//!   same key on every installation, which lets the storage backend
//!   verify the key without any shared state, but it also means a
//!   precomputed table for one vault works against every vault.
//! - **v2** mixes in a per-vault random salt kept in `upass.toml`.
//!
//! Both use 100 000 iterations and a 32-byte output (AES-256).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use super::keys::{DerivedKey, KEY_LEN};
use crate::errors::{Result, UpassError};

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of a v2 salt in bytes.
pub const SALT_LEN: usize = 16;

/// Which derivation scheme to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum KdfVersion {
    /// Empty salt, deterministic across installations.
    #[default]
    V1,
    /// Per-vault random salt.
    V2,
}

impl TryFrom<u8> for KdfVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(format!("unsupported kdf version {other}")),
        }
    }
}

impl From<KdfVersion> for u8 {
    fn from(version: KdfVersion) -> Self {
        match version {
            KdfVersion::V1 => 1,
            KdfVersion::V2 => 2,
        }
    }
}

/// Everything needed to turn a passphrase into a key.
#[derive(Debug, Clone, Default)]
pub struct KdfParams {
    pub version: KdfVersion,
    /// Only consulted for v2.
    pub salt: Option<Vec<u8>>,
}

impl KdfParams {
    /// The unsalted v1 scheme.
    pub fn v1() -> Self {
        Self::default()
    }

    /// The salted v2 scheme.
    pub fn v2(salt: Vec<u8>) -> Self {
        Self {
            version: KdfVersion::V2,
            salt: Some(salt),
        }
    }

    /// Derive the key for `passphrase` under these parameters.
    ///
    /// v1 never fails.  v2 fails when no salt is configured.
    pub fn derive(&self, passphrase: &str) -> Result<DerivedKey> {
        match self.version {
            KdfVersion::V1 => Ok(derive_key(passphrase)),
            KdfVersion::V2 => {
                let salt = self.salt.as_deref().ok_or_else(|| {
                    UpassError::ConfigError("kdf v2 selected but no kdf_salt is configured".into())
                })?;
                if salt.is_empty() {
                    return Err(UpassError::KeyDerivationFailed(
                        "kdf v2 requires a non-empty salt".into(),
                    ));
                }
                Ok(derive_key_with_salt(passphrase, salt))
            }
        }
    }
}

/// Derive a key with the v1 (empty salt) scheme.
pub fn derive_key(passphrase: &str) -> DerivedKey {
    derive_key_with_salt(passphrase, &[])
}

/// Derive a key from `passphrase` and an explicit `salt`.
pub fn derive_key_with_salt(passphrase: &str, salt: &[u8]) -> DerivedKey {
    stretch(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS)
}

fn stretch(password: &[u8], salt: &[u8], rounds: u32) -> DerivedKey {
    let mut bytes = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, rounds, &mut bytes);
    let key = DerivedKey::new(bytes);
    bytes.zeroize();
    key
}

/// Generate a random v2 salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Encode a salt for storage in `upass.toml`.
pub fn encode_salt(salt: &[u8]) -> String {
    BASE64.encode(salt)
}

/// Decode a salt read from `upass.toml`.
pub fn decode_salt(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| UpassError::ConfigError(format!("kdf_salt is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_is_deterministic() {
        let a = derive_key("correct horse");
        let b = derive_key("correct horse");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn stretch_matches_pbkdf2_sha256_vector() {
        let key = stretch(b"password", b"salt", 4096);
        assert_eq!(
            key.to_hex(),
            "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a"
        );
    }

    #[test]
    fn v1_uses_an_empty_salt() {
        let key = derive_key("password");
        assert_eq!(key.as_bytes(), derive_key_with_salt("password", b"").as_bytes());
        assert_eq!(key.to_hex().len(), 64);
    }

    #[test]
    fn salt_changes_the_key() {
        let plain = derive_key("passphrase");
        let salted = derive_key_with_salt("passphrase", &[7u8; SALT_LEN]);
        assert_ne!(plain.as_bytes(), salted.as_bytes());
    }

    #[test]
    fn v2_without_salt_is_a_config_error() {
        let params = KdfParams {
            version: KdfVersion::V2,
            salt: None,
        };
        assert!(matches!(
            params.derive("passphrase"),
            Err(UpassError::ConfigError(_))
        ));
    }

    #[test]
    fn v2_with_salt_matches_explicit_derivation() {
        let salt = generate_salt().to_vec();
        let key = KdfParams::v2(salt.clone()).derive("passphrase").unwrap();
        assert_eq!(
            key.as_bytes(),
            derive_key_with_salt("passphrase", &salt).as_bytes()
        );
    }

    #[test]
    fn salt_encoding_roundtrips() {
        let salt = generate_salt();
        let decoded = decode_salt(&encode_salt(&salt)).unwrap();
        assert_eq!(decoded, salt);
        assert!(decode_salt("not base64!!").is_err());
    }
}
