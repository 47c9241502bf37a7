//! Integration tests for the UPass crypto module.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use upass::crypto::keys::KEY_LEN;
use upass::crypto::{
    decrypt, decrypt_json, derive_key, encrypt, encrypt_json, encrypt_with, DerivedKey, Envelope,
    EnvelopeVersion,
};
use upass::errors::UpassError;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Credential {
    username: String,
    password: String,
}

fn key(byte: u8) -> DerivedKey {
    DerivedKey::new([byte; KEY_LEN])
}

fn sample() -> Credential {
    Credential {
        username: "alice@example.com".into(),
        password: "correct horse battery staple".into(),
    }
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn json_roundtrip_through_passphrase() {
    let key = derive_key("my master key");
    let env = encrypt_json(&sample(), &key, EnvelopeVersion::V1).expect("encrypt");

    // Re-deriving from the same passphrase opens it.
    let again = derive_key("my master key");
    let back: Credential = decrypt_json(&env, &again).expect("decrypt");
    assert_eq!(back, sample());
}

#[test]
fn roundtrip_survives_the_wire_form() {
    for version in [EnvelopeVersion::V1, EnvelopeVersion::V2] {
        let env = encrypt_json(&sample(), &key(3), version).unwrap();
        let wire = env.to_json().unwrap();
        let parsed = Envelope::from_json(&wire).unwrap();
        let back: Credential = decrypt_json(&parsed, &key(3)).unwrap();
        assert_eq!(back, sample());
    }
}

#[test]
fn roundtrip_of_block_aligned_plaintext() {
    let plaintext = [0x41u8; 32];
    let env = encrypt(&plaintext, &key(1)).unwrap();
    // A full block of padding is added to aligned input.
    assert_eq!(env.ciphertext.len(), 48);
    assert_eq!(decrypt(&env, &key(1)).unwrap(), plaintext);
}

#[test]
fn wire_form_is_two_base64_fields() {
    let env = encrypt(b"hello", &key(1)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert!(object["iv"].is_string());
    assert!(object["ciphertext"].is_string());
}

// ---------------------------------------------------------------------------
// Wrong key and tampering
// ---------------------------------------------------------------------------

#[test]
fn wrong_passphrase_fails() {
    let env = encrypt_json(&sample(), &derive_key("right one"), EnvelopeVersion::V1).unwrap();
    let result: Result<Credential, _> = decrypt_json(&env, &derive_key("wrong one"));
    assert!(matches!(result, Err(UpassError::DecryptionFailed)));
}

#[test]
fn every_single_bit_flip_of_cbc_ciphertext_is_detected() {
    let key = key(9);
    let env = encrypt_json(&sample(), &key, EnvelopeVersion::V1).unwrap();

    for byte in 0..env.ciphertext.len() {
        for bit in 0..8 {
            let mut tampered = env.clone();
            tampered.ciphertext[byte] ^= 1 << bit;
            let result: Result<Credential, _> = decrypt_json(&tampered, &key);
            assert!(
                matches!(result, Err(UpassError::DecryptionFailed)),
                "flip of byte {byte} bit {bit} went unnoticed"
            );
        }
    }
}

#[test]
fn every_single_bit_flip_of_gcm_envelope_is_detected() {
    let key = key(9);
    let env = encrypt_json(&sample(), &key, EnvelopeVersion::V2).unwrap();

    for byte in 0..env.ciphertext.len() {
        for bit in 0..8 {
            let mut tampered = env.clone();
            tampered.ciphertext[byte] ^= 1 << bit;
            assert!(decrypt(&tampered, &key).is_err());
        }
    }
    for byte in 0..env.iv.len() {
        let mut tampered = env.clone();
        tampered.iv[byte] ^= 0x80;
        assert!(decrypt(&tampered, &key).is_err());
    }
}

#[test]
fn truncated_ciphertext_fails() {
    let mut env = encrypt(b"some payload here", &key(2)).unwrap();
    env.ciphertext.truncate(env.ciphertext.len() - 1);
    assert!(matches!(
        decrypt(&env, &key(2)),
        Err(UpassError::DecryptionFailed)
    ));

    env.ciphertext.clear();
    assert!(decrypt(&env, &key(2)).is_err());
}

// ---------------------------------------------------------------------------
// IV uniqueness
// ---------------------------------------------------------------------------

#[test]
fn ten_thousand_encryptions_use_distinct_ivs() {
    let key = key(5);
    let ivs: HashSet<Vec<u8>> = (0..10_000)
        .map(|_| encrypt(b"x", &key).unwrap().iv)
        .collect();
    assert_eq!(ivs.len(), 10_000);
}

#[test]
fn same_plaintext_encrypts_differently() {
    let a = encrypt_with(EnvelopeVersion::V1, b"same", &key(1)).unwrap();
    let b = encrypt_with(EnvelopeVersion::V1, b"same", &key(1)).unwrap();
    assert_ne!(a.iv, b.iv);
    assert_ne!(a.ciphertext, b.ciphertext);
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derivation_is_deterministic_and_passphrase_sensitive() {
    let a = derive_key("hunter22");
    let b = derive_key("hunter22");
    let c = derive_key("hunter23");
    assert_eq!(a.to_hex(), b.to_hex());
    assert_ne!(a.to_hex(), c.to_hex());
    assert_eq!(a.to_hex().len(), 64);
}

#[test]
fn derived_key_debug_does_not_leak() {
    let key = derive_key("hunter22");
    assert!(!format!("{key:?}").contains(&key.to_hex()));
}
