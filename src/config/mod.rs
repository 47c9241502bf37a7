//! Configuration and local state.
//!
//! - `upass.toml` settings (`settings`)
//! - The stored master key, `settings.json` (`master_key`)
//! - Passphrase acceptance rules (`policy`)
//! - Lockout state between CLI runs, `lockout.json` (`state`)

pub mod master_key;
pub mod policy;
pub mod settings;
pub mod state;

pub use master_key::{FileKeyStore, FixedKey, MasterKeyStore};
pub use policy::PassphrasePolicy;
pub use settings::Settings;
