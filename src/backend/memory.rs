//! In-process backend.
//!
//! Behaves like the storage service: it is provisioned with one key
//! (it remembers only the key's SHA-256 fingerprint), refuses any other
//! key with `DecryptionFailed`, and keeps records in a site-ordered map.

use std::collections::BTreeMap;

use subtle::ConstantTimeEq;

use super::{Backend, EncryptOutcome, SaveStatus, SealedCredential, StorageStatus};
use crate::crypto::DerivedKey;
use crate::errors::{Result, UpassError};

const DEVICE_PATH: &str = "/memory";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Database {
    Missing,
    Plain,
    Encrypted { fingerprint: [u8; 32] },
}

/// A backend that lives entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    device_present: bool,
    reachable: bool,
    database: Database,
    records: BTreeMap<String, SealedCredential>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// A device with no database on it yet.
    pub fn new() -> Self {
        Self {
            device_present: true,
            reachable: true,
            database: Database::Missing,
            records: BTreeMap::new(),
        }
    }

    /// No storage device attached.
    pub fn without_device() -> Self {
        Self {
            device_present: false,
            ..Self::new()
        }
    }

    /// A device holding an unencrypted database.
    pub fn with_plain_database() -> Self {
        Self {
            database: Database::Plain,
            ..Self::new()
        }
    }

    /// A device whose database is already encrypted under `key`.
    pub fn provisioned(key: &DerivedKey) -> Self {
        Self {
            database: Database::Encrypted {
                fingerprint: key.fingerprint(),
            },
            ..Self::new()
        }
    }

    /// Simulate the service going away (or coming back).
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored records in site order.
    pub fn records(&self) -> impl Iterator<Item = &SealedCredential> {
        self.records.values()
    }

    fn ensure_reachable(&self) -> Result<()> {
        if !self.reachable {
            return Err(UpassError::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn ensure_device(&self) -> Result<()> {
        self.ensure_reachable()?;
        if !self.device_present {
            return Err(UpassError::Transport("No USB drive found.".into()));
        }
        Ok(())
    }

    fn authorize(&self, key: &DerivedKey) -> Result<()> {
        self.ensure_device()?;
        match &self.database {
            Database::Encrypted { fingerprint } => {
                if bool::from(fingerprint.as_slice().ct_eq(key.fingerprint().as_slice())) {
                    Ok(())
                } else {
                    Err(UpassError::DecryptionFailed)
                }
            }
            Database::Missing => Err(UpassError::Transport(
                "Database file does not exist.".into(),
            )),
            Database::Plain => Err(UpassError::Transport(
                "Database is not encrypted yet.".into(),
            )),
        }
    }
}

impl Backend for MemoryBackend {
    fn status(&mut self) -> Result<StorageStatus> {
        self.ensure_reachable()?;
        if !self.device_present {
            return Ok(StorageStatus::default());
        }
        Ok(StorageStatus {
            usb_found: true,
            db_exists: self.database != Database::Missing,
            encrypted: matches!(self.database, Database::Encrypted { .. }),
            usb_path: Some(DEVICE_PATH.into()),
            db_path: Some(format!("{DEVICE_PATH}/passwords.db")),
        })
    }

    fn setup(&mut self, key: &DerivedKey) -> Result<()> {
        self.ensure_device()?;
        if self.database != Database::Missing {
            return Err(UpassError::Transport(
                "Database already exists. Use /encryptUSB instead.".into(),
            ));
        }
        self.database = Database::Encrypted {
            fingerprint: key.fingerprint(),
        };
        Ok(())
    }

    fn encrypt_storage(&mut self, key: &DerivedKey) -> Result<EncryptOutcome> {
        self.ensure_device()?;
        match self.database {
            Database::Missing => Err(UpassError::Transport(
                "Database file does not exist.".into(),
            )),
            Database::Encrypted { .. } => Ok(EncryptOutcome::AlreadyEncrypted),
            Database::Plain => {
                self.database = Database::Encrypted {
                    fingerprint: key.fingerprint(),
                };
                Ok(EncryptOutcome::Encrypted)
            }
        }
    }

    fn save(
        &mut self,
        key: &DerivedKey,
        record: &SealedCredential,
        force: bool,
    ) -> Result<SaveStatus> {
        self.authorize(key)?;
        let exists = self.records.contains_key(&record.site);
        if exists && !force {
            return Ok(SaveStatus::Exists);
        }
        self.records.insert(record.site.clone(), record.clone());
        Ok(if exists {
            SaveStatus::Overwritten
        } else {
            SaveStatus::Inserted
        })
    }

    fn fetch(&mut self, key: &DerivedKey, site: &str) -> Result<Option<SealedCredential>> {
        self.authorize(key)?;
        Ok(self.records.get(site).cloned())
    }

    fn import(&mut self, key: &DerivedKey, records: &[SealedCredential]) -> Result<usize> {
        self.authorize(key)?;
        for record in records {
            self.records.insert(record.site.clone(), record.clone());
        }
        Ok(records.len())
    }

    fn export(&mut self, key: &DerivedKey) -> Result<Vec<SealedCredential>> {
        self.authorize(key)?;
        Ok(self.records.values().cloned().collect())
    }
}
