use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::policy::PassphrasePolicy;
use crate::crypto::kdf::decode_salt;
use crate::crypto::{EnvelopeVersion, KdfParams, KdfVersion};
use crate::errors::{Result, UpassError};
use crate::lockout::{LockoutPolicy, DEFAULT_FREEZE_SECS, DEFAULT_MAX_FAILS, MAX_FREEZE_SECS};

/// Client configuration, loaded from `<config_dir>/upass.toml`.
///
/// Every field has a sensible default so UPass works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the storage service.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Per-request timeout for the storage service, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub crypto: CryptoSettings,

    #[serde(default)]
    pub lockout: LockoutSettings,

    #[serde(default)]
    pub passphrase: PassphraseSettings,
}

/// `[crypto]` — key derivation and envelope versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoSettings {
    /// 1 = unsalted PBKDF2, 2 = salted with `kdf_salt`.
    #[serde(default)]
    pub kdf: KdfVersion,

    /// Base64 salt for kdf 2.  Written by `upass key set`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_salt: Option<String>,

    /// 1 = AES-256-CBC, 2 = AES-256-GCM.
    #[serde(default)]
    pub envelope: EnvelopeVersion,
}

/// `[lockout]` — failure throttling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutSettings {
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,

    #[serde(default = "default_freeze_secs")]
    pub freeze_secs: u64,
}

/// `[passphrase]` — which master keys `upass key set` accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassphraseSettings {
    #[serde(default)]
    pub policy: PolicyKind,

    /// Only used by the `min-length` policy.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    MinLength,
    Hex64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_backend_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_fails() -> u32 {
    DEFAULT_MAX_FAILS
}

fn default_freeze_secs() -> u64 {
    DEFAULT_FREEZE_SECS
}

fn default_min_length() -> usize {
    6
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
            crypto: CryptoSettings::default(),
            lockout: LockoutSettings::default(),
            passphrase: PassphraseSettings::default(),
        }
    }
}

impl Default for LockoutSettings {
    fn default() -> Self {
        Self {
            max_fails: default_max_fails(),
            freeze_secs: default_freeze_secs(),
        }
    }
}

impl Default for PassphraseSettings {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            min_length: default_min_length(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the config directory.
    pub const FILE_NAME: &'static str = "upass.toml";

    /// Load settings from `<config_dir>/upass.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            UpassError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Write settings back to `<config_dir>/upass.toml`, creating the
    /// directory if needed.
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir)?;
        let contents = toml::to_string_pretty(self)
            .map_err(|e| UpassError::SerializationError(format!("upass.toml: {e}")))?;
        std::fs::write(config_dir.join(Self::FILE_NAME), contents)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Convert the `[crypto]` settings into KDF parameters.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        match self.crypto.kdf {
            KdfVersion::V1 => Ok(KdfParams::v1()),
            KdfVersion::V2 => {
                let encoded = self.crypto.kdf_salt.as_deref().ok_or_else(|| {
                    UpassError::ConfigError(
                        "[crypto] kdf = 2 requires kdf_salt (run `upass key set`)".into(),
                    )
                })?;
                Ok(KdfParams::v2(decode_salt(encoded)?))
            }
        }
    }

    pub fn lockout_policy(&self) -> Result<LockoutPolicy> {
        if self.lockout.freeze_secs > MAX_FREEZE_SECS {
            return Err(UpassError::ConfigError(format!(
                "[lockout] freeze_secs = {} exceeds the maximum of {MAX_FREEZE_SECS}",
                self.lockout.freeze_secs
            )));
        }
        Ok(LockoutPolicy {
            max_fails: self.lockout.max_fails,
            freeze_secs: self.lockout.freeze_secs,
        })
    }

    pub fn passphrase_policy(&self) -> PassphrasePolicy {
        match self.passphrase.policy {
            PolicyKind::MinLength => PassphrasePolicy::MinLength(self.passphrase.min_length),
            PolicyKind::Hex64 => PassphrasePolicy::Hex64,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.backend_url, "http://127.0.0.1:5000");
        assert_eq!(s.timeout_secs, 10);
        assert_eq!(s.crypto.kdf, KdfVersion::V1);
        assert_eq!(s.crypto.envelope, EnvelopeVersion::V1);
        assert_eq!(s.lockout_policy().unwrap(), LockoutPolicy::default());
        assert_eq!(s.passphrase_policy(), PassphrasePolicy::MinLength(6));
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Settings::load(tmp.path()).unwrap(), Settings::default());
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
backend_url = "http://10.0.0.2:8080"
timeout_secs = 3

[crypto]
kdf = 2
kdf_salt = "AAECAwQFBgcICQoLDA0ODw=="
envelope = 2

[lockout]
max_fails = 3
freeze_secs = 120

[passphrase]
policy = "hex64"
"#;
        fs::write(tmp.path().join("upass.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.backend_url, "http://10.0.0.2:8080");
        assert_eq!(settings.timeout(), Duration::from_secs(3));
        assert_eq!(settings.crypto.envelope, EnvelopeVersion::V2);
        assert_eq!(
            settings.kdf_params().unwrap().salt.unwrap(),
            (0u8..16).collect::<Vec<_>>()
        );
        assert_eq!(settings.lockout_policy().unwrap().max_fails, 3);
        assert_eq!(settings.passphrase_policy(), PassphrasePolicy::Hex64);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("upass.toml"), "[lockout]\nmax_fails = 2\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.lockout.max_fails, 2);
        assert_eq!(settings.lockout.freeze_secs, 60);
        assert_eq!(settings.backend_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("upass.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("upass.toml"), "[crypto]\nenvelope = 7\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn kdf_v2_without_salt_is_a_config_error() {
        let mut s = Settings::default();
        s.crypto.kdf = KdfVersion::V2;
        assert!(matches!(s.kdf_params(), Err(UpassError::ConfigError(_))));
    }

    #[test]
    fn oversized_freeze_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("upass.toml"),
            "[lockout]\nfreeze_secs = 9223372036854775807\n",
        )
        .unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert!(matches!(
            settings.lockout_policy(),
            Err(UpassError::ConfigError(_))
        ));

        let mut s = Settings::default();
        s.lockout.freeze_secs = MAX_FREEZE_SECS;
        assert_eq!(s.lockout_policy().unwrap().freeze_secs, MAX_FREEZE_SECS);
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let mut s = Settings::default();
        s.crypto.kdf = KdfVersion::V2;
        s.crypto.kdf_salt = Some("c2FsdHNhbHRzYWx0c2FsdA==".into());
        s.save(&tmp.path().join("nested")).unwrap();
        assert_eq!(Settings::load(&tmp.path().join("nested")).unwrap(), s);
    }
}
