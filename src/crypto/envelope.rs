//! The encryption envelope: `{ iv, ciphertext }`.
//!
//! **v1** (default) is AES-256-CBC over PKCS#7-padded plaintext with a
//! fresh random 16-byte IV per call.  CBC carries no authentication tag;
//! the only integrity signal is that the padding and the JSON payload
//! inside must both parse.  Callers that need tamper evidence should
//! use `decrypt_json`, never the raw byte API.
//!
//! **v2** (opt-in) is AES-256-GCM in the same shape: `iv` holds the
//! 12-byte nonce, `ciphertext` carries the 16-byte tag at its end, and
//! the JSON form gains `"v": 2`.
//!
//! JSON wire form:
//!
//! ```text
//! {"iv": "<base64>", "ciphertext": "<base64>"}            // v1
//! {"v": 2, "iv": "<base64>", "ciphertext": "<base64>"}    // v2
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::encoding::{base64_decode, base64_encode};
use super::keys::DerivedKey;
use super::padding::{self, BLOCK_SIZE};
use crate::errors::{Result, UpassError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// CBC initialization vector length.
pub const CBC_IV_LEN: usize = 16;

/// GCM nonce length.
pub const GCM_NONCE_LEN: usize = 12;

/// Envelope format version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EnvelopeVersion {
    /// AES-256-CBC, unauthenticated.
    #[default]
    V1,
    /// AES-256-GCM, authenticated.
    V2,
}

impl EnvelopeVersion {
    fn is_v1(&self) -> bool {
        *self == Self::V1
    }
}

impl TryFrom<u8> for EnvelopeVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(format!("unsupported envelope version {other}")),
        }
    }
}

impl From<EnvelopeVersion> for u8 {
    fn from(version: EnvelopeVersion) -> Self {
        match version {
            EnvelopeVersion::V1 => 1,
            EnvelopeVersion::V2 => 2,
        }
    }
}

/// The output of one encryption call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "v", default, skip_serializing_if = "EnvelopeVersion::is_v1")]
    pub version: EnvelopeVersion,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| UpassError::SerializationError(format!("envelope: {e}")))
    }

    /// Parse the JSON wire form.  Malformed base64 or JSON is a
    /// decryption failure, since it means the stored data is unusable.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|_| UpassError::DecryptionFailed)
    }
}

/// Encrypt `plaintext` under `key` with the v1 (CBC) scheme.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> Result<Envelope> {
    encrypt_with(EnvelopeVersion::V1, plaintext, key)
}

/// Encrypt `plaintext` under `key` with an explicit envelope version.
pub fn encrypt_with(
    version: EnvelopeVersion,
    plaintext: &[u8],
    key: &DerivedKey,
) -> Result<Envelope> {
    match version {
        EnvelopeVersion::V1 => encrypt_cbc(plaintext, key),
        EnvelopeVersion::V2 => encrypt_gcm(plaintext, key),
    }
}

/// Decrypt an envelope of either version.
///
/// No partial plaintext is ever returned: any failure is `DecryptionFailed`.
pub fn decrypt(envelope: &Envelope, key: &DerivedKey) -> Result<Vec<u8>> {
    match envelope.version {
        EnvelopeVersion::V1 => decrypt_cbc(envelope, key),
        EnvelopeVersion::V2 => decrypt_gcm(envelope, key),
    }
}

/// Serialize `value` as JSON and encrypt it.
pub fn encrypt_json<T: Serialize>(
    value: &T,
    key: &DerivedKey,
    version: EnvelopeVersion,
) -> Result<Envelope> {
    let json = Zeroizing::new(
        serde_json::to_vec(value)
            .map_err(|e| UpassError::SerializationError(format!("payload: {e}")))?,
    );
    encrypt_with(version, &json, key)
}

/// Decrypt an envelope and parse its plaintext as JSON.
///
/// With v1 this is the integrity check: a wrong key or a flipped bit
/// leaves either bad padding or bytes that are not UTF-8 JSON.
pub fn decrypt_json<T: DeserializeOwned>(envelope: &Envelope, key: &DerivedKey) -> Result<T> {
    let plaintext = Zeroizing::new(decrypt(envelope, key)?);
    let text = std::str::from_utf8(&plaintext).map_err(|_| UpassError::DecryptionFailed)?;
    serde_json::from_str(text).map_err(|_| UpassError::DecryptionFailed)
}

fn encrypt_cbc(plaintext: &[u8], key: &DerivedKey) -> Result<Envelope> {
    let mut iv = [0u8; CBC_IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| UpassError::EncryptionFailed(format!("invalid key or iv length: {e}")))?;

    let padded = Zeroizing::new(padding::pad(plaintext));
    let ciphertext = cipher.encrypt_padded_vec_mut::<NoPadding>(&padded);

    Ok(Envelope {
        version: EnvelopeVersion::V1,
        iv: iv.to_vec(),
        ciphertext,
    })
}

fn decrypt_cbc(envelope: &Envelope, key: &DerivedKey) -> Result<Vec<u8>> {
    if envelope.iv.len() != CBC_IV_LEN
        || envelope.ciphertext.is_empty()
        || envelope.ciphertext.len() % BLOCK_SIZE != 0
    {
        return Err(UpassError::DecryptionFailed);
    }

    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), &envelope.iv)
        .map_err(|_| UpassError::DecryptionFailed)?;

    let padded = Zeroizing::new(
        cipher
            .decrypt_padded_vec_mut::<NoPadding>(&envelope.ciphertext)
            .map_err(|_| UpassError::DecryptionFailed)?,
    );

    Ok(padding::unpad(&padded)?.to_vec())
}

fn encrypt_gcm(plaintext: &[u8], key: &DerivedKey) -> Result<Envelope> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| UpassError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let mut nonce = [0u8; GCM_NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| UpassError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok(Envelope {
        version: EnvelopeVersion::V2,
        iv: nonce.to_vec(),
        ciphertext,
    })
}

fn decrypt_gcm(envelope: &Envelope, key: &DerivedKey) -> Result<Vec<u8>> {
    if envelope.iv.len() != GCM_NONCE_LEN {
        return Err(UpassError::DecryptionFailed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| UpassError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_slice())
        .map_err(|_| UpassError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KEY_LEN;

    fn key(byte: u8) -> DerivedKey {
        DerivedKey::new([byte; KEY_LEN])
    }

    #[test]
    fn cbc_ciphertext_is_block_aligned() {
        for len in [0usize, 1, 15, 16, 17, 31, 32, 100] {
            let env = encrypt(&vec![0x61; len], &key(1)).unwrap();
            assert_eq!(env.iv.len(), CBC_IV_LEN);
            assert_eq!(env.ciphertext.len() % BLOCK_SIZE, 0);
            assert!(env.ciphertext.len() > len);
        }
    }

    #[test]
    fn v1_wire_form_has_no_version_marker() {
        let env = encrypt(b"x", &key(1)).unwrap();
        let json = env.to_json().unwrap();
        assert!(!json.contains("\"v\""));
        assert_eq!(Envelope::from_json(&json).unwrap(), env);
    }

    #[test]
    fn v2_wire_form_carries_version_marker() {
        let env = encrypt_with(EnvelopeVersion::V2, b"x", &key(1)).unwrap();
        let json = env.to_json().unwrap();
        assert!(json.contains("\"v\":2"));
        let parsed = Envelope::from_json(&json).unwrap();
        assert_eq!(parsed.version, EnvelopeVersion::V2);
        assert_eq!(decrypt(&parsed, &key(1)).unwrap(), b"x");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let json = r#"{"v":9,"iv":"AAAA","ciphertext":"AAAA"}"#;
        assert!(matches!(
            Envelope::from_json(json),
            Err(UpassError::DecryptionFailed)
        ));
    }

    #[test]
    fn bad_base64_is_a_decryption_failure() {
        let json = r#"{"iv":"***","ciphertext":"AAAA"}"#;
        assert!(matches!(
            Envelope::from_json(json),
            Err(UpassError::DecryptionFailed)
        ));
    }

    #[test]
    fn wrong_iv_length_fails() {
        let mut env = encrypt(b"payload", &key(1)).unwrap();
        env.iv.truncate(8);
        assert!(decrypt(&env, &key(1)).is_err());
    }

    #[test]
    fn gcm_rejects_any_tampering() {
        let mut env = encrypt_with(EnvelopeVersion::V2, b"payload", &key(1)).unwrap();
        env.ciphertext[0] ^= 0x01;
        assert!(matches!(
            decrypt(&env, &key(1)),
            Err(UpassError::DecryptionFailed)
        ));
    }

    #[test]
    fn decrypt_json_rejects_non_json_plaintext() {
        let env = encrypt(b"definitely not json", &key(1)).unwrap();
        let result: Result<serde_json::Value> = decrypt_json(&env, &key(1));
        assert!(matches!(result, Err(UpassError::DecryptionFailed)));
    }

    #[test]
    fn decrypt_json_rejects_non_utf8_plaintext() {
        let env = encrypt(&[0xff, 0xfe, 0xfd], &key(1)).unwrap();
        let result: Result<serde_json::Value> = decrypt_json(&env, &key(1));
        assert!(matches!(result, Err(UpassError::DecryptionFailed)));
    }
}
