//! Master-key acceptance rules, applied once at the UI boundary.

use crate::errors::{Result, UpassError};

/// Which passphrases `upass key set` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphrasePolicy {
    /// Any passphrase of at least this many characters.
    MinLength(usize),
    /// Exactly 64 hex digits (a raw 256-bit key written out).
    Hex64,
}

impl Default for PassphrasePolicy {
    fn default() -> Self {
        Self::MinLength(6)
    }
}

impl PassphrasePolicy {
    pub fn validate(&self, passphrase: &str) -> Result<()> {
        match *self {
            Self::MinLength(min) => {
                let len = passphrase.chars().count();
                if len < min.max(1) {
                    return Err(UpassError::InvalidPassphrase(format!(
                        "must be at least {} characters",
                        min.max(1)
                    )));
                }
            }
            Self::Hex64 => {
                if passphrase.len() != 64 || !passphrase.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(UpassError::InvalidPassphrase(
                        "must be exactly 64 hexadecimal characters".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}
