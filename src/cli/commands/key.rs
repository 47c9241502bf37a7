//! `upass key` — set or clear the stored master key.
//!
//! Usage:
//!   upass key set     # prompt (or read UPASS_PASSPHRASE) and store
//!   upass key clear   # forget the stored key

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{config_dir, load_settings, prompt_new_passphrase, Cli};
use crate::config::{FileKeyStore, MasterKeyStore};
use crate::crypto::kdf::{encode_salt, generate_salt};
use crate::crypto::KdfVersion;
use crate::errors::{Result, UpassError};

/// Execute `key set`.
pub fn execute_set(cli: &Cli) -> Result<()> {
    let dir = config_dir(cli)?;
    let mut settings = load_settings(cli)?;
    let mut store = FileKeyStore::new(&dir);

    if store.load()?.is_some() && std::env::var(crate::cli::PASSPHRASE_ENV).is_err() {
        output::warning(
            "A master key is already set. Data saved under it will not open with a new one.",
        );
        let replace = Confirm::new()
            .with_prompt("Replace the master key?")
            .default(false)
            .interact()
            .map_err(|e| UpassError::CommandFailed(format!("confirm prompt: {e}")))?;
        if !replace {
            return Err(UpassError::UserCancelled);
        }
    }

    let passphrase = prompt_new_passphrase(settings.passphrase_policy())?;

    // Salted derivation needs its salt before the first key is used.
    if settings.crypto.kdf == KdfVersion::V2 && settings.crypto.kdf_salt.is_none() {
        settings.crypto.kdf_salt = Some(encode_salt(&generate_salt()));
        settings.save(&dir)?;
        output::info("Generated a new key-derivation salt in upass.toml");
    }

    store.store(&passphrase)?;
    output::success(&format!("Master key saved to {}", store.path().display()));
    output::tip("Run `upass init` to prepare the storage device.");
    Ok(())
}

/// Execute `key clear`.
pub fn execute_clear(cli: &Cli) -> Result<()> {
    let mut store = FileKeyStore::new(&config_dir(cli)?);
    store.clear()?;
    output::success("Master key cleared");
    Ok(())
}
