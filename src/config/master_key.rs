//! Where the user's master key lives between runs.
//!
//! The key is the passphrase itself, kept in `<config_dir>/settings.json`
//! as `{"masterKey": "..."}` with owner-only permissions.  It has no
//! expiry; `upass key clear` removes it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{Result, UpassError};

/// Source of the master key for dispatched operations.
pub trait MasterKeyStore: Send {
    /// The stored key, or `None` when none has been set.
    fn load(&self) -> Result<Option<Zeroizing<String>>>;

    /// Replace the stored key.
    fn store(&mut self, key: &str) -> Result<()>;

    /// Forget the stored key.
    fn clear(&mut self) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    master_key: Option<String>,
}

/// The `settings.json` key store.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub const FILE_NAME: &'static str = "settings.json";

    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MasterKeyStore for FileKeyStore {
    fn load(&self) -> Result<Option<Zeroizing<String>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = Zeroizing::new(std::fs::read_to_string(&self.path)?);
        let mut file: SettingsFile = serde_json::from_str(&contents).map_err(|e| {
            UpassError::ConfigError(format!("Failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(file
            .master_key
            .take()
            .filter(|k| !k.is_empty())
            .map(Zeroizing::new))
    }

    fn store(&mut self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = Zeroizing::new(
            serde_json::to_string_pretty(&SettingsFile {
                master_key: Some(key.to_string()),
            })
            .map_err(|e| UpassError::SerializationError(format!("settings.json: {e}")))?,
        );
        write_private(&self.path, json.as_bytes())
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A key held in memory only, e.g. from `UPASS_PASSPHRASE`.
#[derive(Default)]
pub struct FixedKey(Option<Zeroizing<String>>);

impl FixedKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(Zeroizing::new(key.into())))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl MasterKeyStore for FixedKey {
    fn load(&self) -> Result<Option<Zeroizing<String>>> {
        Ok(self.0.clone())
    }

    fn store(&mut self, key: &str) -> Result<()> {
        self.0 = Some(Zeroizing::new(key.to_string()));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.0 = None;
        Ok(())
    }
}

/// Write `contents` to `path` readable by the owner only.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_means_no_key() {
        let dir = TempDir::new().unwrap();
        assert!(FileKeyStore::new(dir.path()).load().unwrap().is_none());
    }

    #[test]
    fn store_load_clear() {
        let dir = TempDir::new().unwrap();
        let mut store = FileKeyStore::new(dir.path());
        store.store("hunter22").unwrap();
        assert_eq!(store.load().unwrap().unwrap().as_str(), "hunter22");

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"masterKey\""));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn settings_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let mut store = FileKeyStore::new(dir.path());
        store.store("hunter22").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        assert!(matches!(
            FileKeyStore::new(dir.path()).load(),
            Err(UpassError::ConfigError(_))
        ));
    }

    #[test]
    fn fixed_key() {
        let mut key = FixedKey::missing();
        assert!(key.load().unwrap().is_none());
        key.store("abc").unwrap();
        assert_eq!(key.load().unwrap().unwrap().as_str(), "abc");
    }
}
