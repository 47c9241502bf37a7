//! Storage backend collaborators.
//!
//! The backend owns the credential map.  UPass only ever hands it
//! sealed records (site + envelope) and the hex form of the derived
//! key, never a passphrase.
//!
//! - `HttpBackend` talks to the storage service over HTTP (`http`).
//! - `MemoryBackend` keeps everything in-process (`memory`).

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

use serde::{Deserialize, Serialize};

use crate::crypto::{DerivedKey, Envelope};
use crate::errors::Result;

/// One stored credential as it crosses the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCredential {
    pub site: String,
    #[serde(flatten)]
    pub envelope: Envelope,
}

/// What the backend did with a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveStatus {
    #[serde(rename = "success")]
    Inserted,
    #[serde(rename = "overwritten")]
    Overwritten,
    /// An entry exists and `force` was not set; nothing changed.
    #[serde(rename = "exists")]
    Exists,
}

/// Result of asking the backend to encrypt an existing plain database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptOutcome {
    #[serde(rename = "success")]
    Encrypted,
    #[serde(rename = "already_encrypted")]
    AlreadyEncrypted,
}

/// Storage device and database state as reported by `/usbStatus`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    pub usb_found: bool,
    #[serde(default)]
    pub db_exists: bool,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usb_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

/// The storage service contract.
///
/// Every keyed call fails with `UpassError::DecryptionFailed` when the
/// backend cannot open its database with `key`, and with
/// `UpassError::Transport` when the service cannot be reached.
pub trait Backend: Send {
    /// Report device and database state.  Not keyed.
    fn status(&mut self) -> Result<StorageStatus>;

    /// Create a fresh database encrypted under `key`.
    fn setup(&mut self, key: &DerivedKey) -> Result<()>;

    /// Encrypt an existing plain database under `key`.
    fn encrypt_storage(&mut self, key: &DerivedKey) -> Result<EncryptOutcome>;

    /// Insert `record`, or replace an existing one when `force` is set.
    fn save(
        &mut self,
        key: &DerivedKey,
        record: &SealedCredential,
        force: bool,
    ) -> Result<SaveStatus>;

    /// Fetch the record stored for `site`, if any.
    fn fetch(&mut self, key: &DerivedKey, site: &str) -> Result<Option<SealedCredential>>;

    /// Merge `records`, last write wins per site.  Returns how many were sent.
    fn import(&mut self, key: &DerivedKey, records: &[SealedCredential]) -> Result<usize>;

    /// Every stored record.
    fn export(&mut self, key: &DerivedKey) -> Result<Vec<SealedCredential>>;
}
