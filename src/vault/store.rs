//! High-level credential operations used by the dispatcher.
//!
//! `CredentialStore` wraps a `Backend` and the crypto layer so that the
//! rest of the application can work with simple method calls like
//! `store.lookup(passphrase, "example.com")`.
//!
//! The store never caches keys or records: every call derives the key
//! from the passphrase it is given, talks to the backend, and drops the
//! key before returning.

use crate::backend::{Backend, EncryptOutcome, SaveStatus, SealedCredential, StorageStatus};
use crate::crypto::{decrypt_json, encrypt_json, DerivedKey, EnvelopeVersion, KdfParams};
use crate::errors::{Result, UpassError};

use super::backup;
use super::entry::{normalize_site, CredentialEntry, Login};

/// What happened to a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Overwritten,
    /// An entry for the site already exists and `force` was not set.
    Conflict,
}

/// Result of looking a site up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(CredentialEntry),
    NotFound,
}

/// Result of probing (and if needed provisioning) the storage device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    /// Device present, database encrypted.
    Ok,
    UsbMissing,
    MissingKey,
    /// A fresh encrypted database was created.
    Created,
    /// An existing plain database was encrypted.
    Encrypted,
}

/// The credential orchestrator.
pub struct CredentialStore<B> {
    backend: B,
    kdf: KdfParams,
    envelope: EnvelopeVersion,
}

impl<B: Backend> CredentialStore<B> {
    /// A store using the v1 KDF and v1 envelope.
    pub fn new(backend: B) -> Self {
        Self::with_crypto(backend, KdfParams::v1(), EnvelopeVersion::V1)
    }

    /// A store with explicit KDF parameters and envelope version.
    pub fn with_crypto(backend: B, kdf: KdfParams, envelope: EnvelopeVersion) -> Self {
        Self {
            backend,
            kdf,
            envelope,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Encrypt and store one credential.
    ///
    /// Without `force`, an existing entry for the site is left alone and
    /// `SaveOutcome::Conflict` is returned.
    pub fn save(
        &mut self,
        passphrase: &str,
        entry: CredentialEntry,
        force: bool,
    ) -> Result<SaveOutcome> {
        let entry = entry.normalized()?;
        let key = self.derive(passphrase)?;
        let sealed = self.seal(&entry, &key)?;

        let outcome = match self.backend.save(&key, &sealed, force)? {
            SaveStatus::Inserted => SaveOutcome::Inserted,
            SaveStatus::Overwritten => SaveOutcome::Overwritten,
            SaveStatus::Exists => SaveOutcome::Conflict,
        };
        tracing::debug!(site = %entry.site, ?outcome, "save");
        Ok(outcome)
    }

    /// Fetch and decrypt the credential for `site`.
    ///
    /// Absence is `NotFound`, not an error.  A record that does not
    /// decrypt under the derived key is `DecryptionFailed`.
    pub fn lookup(&mut self, passphrase: &str, site: &str) -> Result<LookupOutcome> {
        let site = normalize_site(site)?;
        let key = self.derive(passphrase)?;

        match self.backend.fetch(&key, &site)? {
            Some(sealed) => {
                let login: Login = decrypt_json(&sealed.envelope, &key)?;
                Ok(LookupOutcome::Found(CredentialEntry::new(
                    site,
                    login.username.clone(),
                    login.password.clone(),
                )))
            }
            None => Ok(LookupOutcome::NotFound),
        }
    }

    /// Encrypt and merge many credentials at once.  Later entries for
    /// the same site win.  Returns the number of entries given.
    pub fn import_bulk(&mut self, passphrase: &str, entries: Vec<CredentialEntry>) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let entries = entries
            .into_iter()
            .map(CredentialEntry::normalized)
            .collect::<Result<Vec<_>>>()?;
        let key = self.derive(passphrase)?;
        let sealed = entries
            .iter()
            .map(|entry| self.seal(entry, &key))
            .collect::<Result<Vec<_>>>()?;

        let stored = self.backend.import(&key, &sealed)?;
        tracing::debug!(given = entries.len(), stored, "import");
        Ok(entries.len())
    }

    /// Every credential, decrypted and ordered by site.
    pub fn export_entries(&mut self, passphrase: &str) -> Result<Vec<CredentialEntry>> {
        let key = self.derive(passphrase)?;
        let mut entries = self
            .backend
            .export(&key)?
            .iter()
            .map(|sealed| open(sealed, &key))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.site.cmp(&b.site));
        Ok(entries)
    }

    /// Every credential rendered in the plain-text backup format.
    pub fn export_all(&mut self, passphrase: &str) -> Result<String> {
        let entries = self.export_entries(passphrase)?;
        Ok(backup::render(&entries))
    }

    /// Device and database state, as reported by the backend.
    pub fn storage_status(&mut self) -> Result<StorageStatus> {
        self.backend.status()
    }

    /// Make sure the storage device holds an encrypted database.
    ///
    /// Creates one when none exists and encrypts a plain one in place.
    /// `passphrase` is `None` when no master key has been set yet.
    pub fn check_and_init(&mut self, passphrase: Option<&str>) -> Result<InitStatus> {
        let status = self.backend.status()?;
        if !status.usb_found {
            return Ok(InitStatus::UsbMissing);
        }
        let Some(passphrase) = passphrase else {
            return Ok(InitStatus::MissingKey);
        };

        if !status.db_exists {
            let key = self.derive(passphrase)?;
            self.backend.setup(&key)?;
            tracing::info!("created encrypted database");
            return Ok(InitStatus::Created);
        }
        if !status.encrypted {
            let key = self.derive(passphrase)?;
            return Ok(match self.backend.encrypt_storage(&key)? {
                EncryptOutcome::Encrypted => {
                    tracing::info!("encrypted existing database");
                    InitStatus::Encrypted
                }
                EncryptOutcome::AlreadyEncrypted => InitStatus::Ok,
            });
        }
        Ok(InitStatus::Ok)
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn derive(&self, passphrase: &str) -> Result<DerivedKey> {
        if passphrase.is_empty() {
            return Err(UpassError::InvalidPassphrase(
                "master key must not be empty".into(),
            ));
        }
        self.kdf.derive(passphrase)
    }

    fn seal(&self, entry: &CredentialEntry, key: &DerivedKey) -> Result<SealedCredential> {
        Ok(SealedCredential {
            site: entry.site.clone(),
            envelope: encrypt_json(&entry.login(), key, self.envelope)?,
        })
    }
}

fn open(sealed: &SealedCredential, key: &DerivedKey) -> Result<CredentialEntry> {
    let login: Login = decrypt_json(&sealed.envelope, key)?;
    Ok(CredentialEntry::new(
        sealed.site.clone(),
        login.username.clone(),
        login.password.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::crypto::derive_key;

    const PASS: &str = "correct horse";

    fn store() -> CredentialStore<MemoryBackend> {
        CredentialStore::new(MemoryBackend::provisioned(&derive_key(PASS)))
    }

    #[test]
    fn save_then_lookup() {
        let mut store = store();
        let outcome = store
            .save(PASS, CredentialEntry::new("https://www.X.com/login", "me", "pw"), false)
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted);

        match store.lookup(PASS, "x.com").unwrap() {
            LookupOutcome::Found(entry) => {
                assert_eq!(entry, CredentialEntry::new("x.com", "me", "pw"));
            }
            LookupOutcome::NotFound => panic!("entry missing"),
        }
    }

    #[test]
    fn lookup_of_unknown_site_is_not_found() {
        let mut store = store();
        assert_eq!(
            store.lookup(PASS, "nowhere.org").unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn empty_passphrase_is_rejected_before_the_backend() {
        let mut store = store();
        assert!(matches!(
            store.lookup("", "x.com"),
            Err(UpassError::InvalidPassphrase(_))
        ));
    }

    #[test]
    fn empty_import_does_not_touch_the_backend() {
        let mut backend = MemoryBackend::new();
        backend.set_reachable(false);
        let mut store = CredentialStore::new(backend);
        assert_eq!(store.import_bulk(PASS, Vec::new()).unwrap(), 0);
    }

    #[test]
    fn import_rejects_invalid_entries_without_partial_writes() {
        let mut store = store();
        let entries = vec![
            CredentialEntry::new("a.com", "u", "p"),
            CredentialEntry::new("", "u", "p"),
        ];
        assert!(matches!(
            store.import_bulk(PASS, entries),
            Err(UpassError::InvalidInput(_))
        ));
        assert!(store.backend().is_empty());
    }

    #[test]
    fn export_sorts_by_site() {
        let mut store = store();
        store
            .import_bulk(
                PASS,
                vec![
                    CredentialEntry::new("b.org", "bob", "2"),
                    CredentialEntry::new("a.com", "alice", "1"),
                ],
            )
            .unwrap();
        let sites: Vec<_> = store
            .export_entries(PASS)
            .unwrap()
            .into_iter()
            .map(|e| e.site)
            .collect();
        assert_eq!(sites, ["a.com", "b.org"]);
    }

    #[test]
    fn check_and_init_creates_then_reports_ok() {
        let mut store = CredentialStore::new(MemoryBackend::new());
        assert_eq!(store.check_and_init(Some(PASS)).unwrap(), InitStatus::Created);
        assert_eq!(store.check_and_init(Some(PASS)).unwrap(), InitStatus::Ok);
    }

    #[test]
    fn check_and_init_without_key_or_device() {
        let mut store = CredentialStore::new(MemoryBackend::new());
        assert_eq!(store.check_and_init(None).unwrap(), InitStatus::MissingKey);

        let mut store = CredentialStore::new(MemoryBackend::without_device());
        assert_eq!(store.check_and_init(Some(PASS)).unwrap(), InitStatus::UsbMissing);
    }

    #[test]
    fn check_and_init_encrypts_a_plain_database() {
        let mut store = CredentialStore::new(MemoryBackend::with_plain_database());
        assert_eq!(
            store.check_and_init(Some(PASS)).unwrap(),
            InitStatus::Encrypted
        );
    }
}
