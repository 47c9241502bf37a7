use thiserror::Error;

/// All errors that can occur in UPass.
#[derive(Debug, Error)]
pub enum UpassError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Incorrect passphrase — the stored data could not be decrypted")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("No master key set — run `upass key set` first")]
    MissingMasterKey,

    #[error("Credentials already stored for '{0}' (use --force to overwrite)")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid passphrase: {0}")]
    InvalidPassphrase(String),

    #[error("Vault locked after repeated failures — try again in {seconds_remaining}s")]
    Frozen { seconds_remaining: u64 },

    // --- Backend errors ---
    #[error("Backend unreachable: {0}")]
    Transport(String),

    // --- Config errors ---
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl UpassError {
    /// True when the failure says the passphrase (or the data under it) is wrong.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, Self::DecryptionFailed)
    }
}

/// Convenience type alias for UPass results.
pub type Result<T> = std::result::Result<T, UpassError>;
