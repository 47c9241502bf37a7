//! Lockout state carried between one-shot CLI runs.
//!
//! A long-running `upass serve` keeps the guard in memory; every other
//! command loads `<config_dir>/lockout.json` before dispatching and
//! writes it back afterwards, so five wrong passphrases across five
//! separate invocations still freeze the vault.

use std::path::{Path, PathBuf};

use crate::errors::{Result, UpassError};
use crate::lockout::LockoutState;

use super::master_key::write_private;

pub const FILE_NAME: &str = "lockout.json";

pub fn state_path(config_dir: &Path) -> PathBuf {
    config_dir.join(FILE_NAME)
}

/// Read the saved state.  A missing file is a fresh state; an unreadable
/// one is logged and also treated as fresh.
pub fn load_state(config_dir: &Path) -> LockoutState {
    let path = state_path(config_dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LockoutState::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read lockout state");
            return LockoutState::default();
        }
    };
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt lockout state");
        LockoutState::default()
    })
}

/// Persist `state`.  The default state removes the file.
pub fn save_state(config_dir: &Path, state: &LockoutState) -> Result<()> {
    let path = state_path(config_dir);
    if *state == LockoutState::default() {
        return match std::fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
    }
    std::fs::create_dir_all(config_dir)?;
    let json = serde_json::to_string(state)
        .map_err(|e| UpassError::SerializationError(format!("lockout state: {e}")))?;
    write_private(&path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_fresh() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_state(dir.path()), LockoutState::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let state = LockoutState {
            fail_count: 5,
            freeze_until: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
        };
        save_state(dir.path(), &state).unwrap();
        assert_eq!(load_state(dir.path()), state);
    }

    #[test]
    fn default_state_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let state = LockoutState {
            fail_count: 2,
            freeze_until: None,
        };
        save_state(dir.path(), &state).unwrap();
        assert!(state_path(dir.path()).exists());
        save_state(dir.path(), &LockoutState::default()).unwrap();
        assert!(!state_path(dir.path()).exists());
    }

    #[test]
    fn corrupt_file_is_fresh() {
        let dir = TempDir::new().unwrap();
        std::fs::write(state_path(dir.path()), "garbage").unwrap();
        assert_eq!(load_state(dir.path()), LockoutState::default());
    }
}
