//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::backend::{Backend, HttpBackend};
use crate::config::{state, FileKeyStore, FixedKey, MasterKeyStore, PassphrasePolicy, Settings};
use crate::dispatch::{Dispatcher, Request, Response, Status};
use crate::errors::{Result, UpassError};
use crate::lockout::{Clock, LockoutGuard};
use crate::vault::CredentialStore;

/// Environment variable that overrides the stored master key.
pub const PASSPHRASE_ENV: &str = "UPASS_PASSPHRASE";

/// UPass CLI: local credential vault client.
#[derive(Parser)]
#[command(name = "upass", about = "Local credential vault client", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default: ~/.upass)
    #[arg(long, env = "UPASS_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Storage service URL (overrides `backend_url` in upass.toml)
    #[arg(long, env = "UPASS_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Print diagnostic logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Manage the master key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Save credentials for a site
    Save {
        /// Site URL or hostname
        site: String,
        /// Username for the site
        username: String,
        /// Password (omit for interactive prompt or piped stdin)
        password: Option<String>,
        /// Overwrite existing credentials without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Look up the credentials for a site
    Get {
        /// Site URL or hostname
        site: String,
    },

    /// Import credentials from a backup file (text export or JSON array)
    Import {
        /// Path to the file to import
        file: PathBuf,
    },

    /// Export every credential as plain text
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the storage device and create or encrypt its database
    Init,

    /// Show storage, key and lockout status
    Status,

    /// Answer JSON requests on stdin, one per line
    Serve,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },

    /// View the audit log of dispatched actions
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

/// Master key subcommands.
#[derive(clap::Subcommand)]
pub enum KeyAction {
    /// Set (or replace) the master key
    Set,
    /// Forget the stored master key
    Clear,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the config directory: `--config-dir` / `UPASS_CONFIG_DIR`,
/// else `$HOME/.upass`, else `./.upass`.
pub fn config_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.config_dir {
        return Ok(dir.clone());
    }
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(".upass")),
        _ => Ok(std::env::current_dir()?.join(".upass")),
    }
}

/// Load `upass.toml`, applying the `--backend-url` override.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(&config_dir(cli)?)?;
    if let Some(url) = &cli.backend_url {
        settings.backend_url = url.clone();
    }
    Ok(settings)
}

/// Where dispatched operations get the master key: `UPASS_PASSPHRASE`
/// if set, else `settings.json`.
pub fn key_source(cli: &Cli) -> Result<Box<dyn MasterKeyStore>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            return Ok(Box::new(FixedKey::new(pw)));
        }
    }
    Ok(Box::new(FileKeyStore::new(&config_dir(cli)?)))
}

/// Prompt for a new master key with confirmation (used by `key set`).
///
/// Also respects `UPASS_PASSPHRASE` for scripted use.  The key must
/// satisfy `policy`.
///
/// Returns `Zeroizing<String>` so the key is wiped from memory on drop.
pub fn prompt_new_passphrase(policy: PassphrasePolicy) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            let pw = Zeroizing::new(pw);
            policy.validate(&pw)?;
            return Ok(pw);
        }
    }

    loop {
        let passphrase = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose master key")
                .with_confirmation("Confirm master key", "Keys do not match, try again")
                .interact()
                .map_err(|e| UpassError::CommandFailed(format!("passphrase prompt: {e}")))?,
        );

        if let Err(e) = policy.validate(&passphrase) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }

        return Ok(passphrase);
    }
}

/// Build a dispatcher for this invocation: HTTP backend, configured
/// crypto, lockout state resumed from disk, audit log if available.
pub fn build_dispatcher(cli: &Cli) -> Result<Dispatcher<HttpBackend>> {
    let dir = config_dir(cli)?;
    let settings = load_settings(cli)?;

    let backend = HttpBackend::new(&settings.backend_url, settings.timeout());
    let store = CredentialStore::with_crypto(
        backend,
        settings.kdf_params()?,
        settings.crypto.envelope,
    );
    let guard = LockoutGuard::restore(
        settings.lockout_policy()?,
        crate::lockout::SystemClock,
        state::load_state(&dir),
    );
    let dispatcher = Dispatcher::new(store, guard, key_source(cli)?);

    #[cfg(feature = "audit-log")]
    if std::fs::create_dir_all(&dir).is_ok() {
        if let Some(audit) = crate::audit::AuditLog::open(&dir) {
            return Ok(dispatcher.with_audit(Box::new(audit)));
        }
    }

    Ok(dispatcher)
}

/// Dispatch a single request and persist the lockout state afterwards.
pub fn dispatch_once(cli: &Cli, request: Request) -> Result<Response> {
    let mut dispatcher = build_dispatcher(cli)?;
    let response = dispatcher.handle(request);
    persist_lockout(cli, &mut dispatcher);
    Ok(response)
}

/// Save the dispatcher's lockout state.  Failures are logged, not fatal.
pub fn persist_lockout<B: Backend, C: Clock>(cli: &Cli, dispatcher: &mut Dispatcher<B, C>) {
    match config_dir(cli) {
        Ok(dir) => save_lockout(&dir, dispatcher),
        Err(e) => tracing::warn!(error = %e, "could not save lockout state"),
    }
}

/// Save the dispatcher's lockout state under `dir`.  Failures are logged.
pub fn save_lockout<B: Backend, C: Clock>(dir: &Path, dispatcher: &mut Dispatcher<B, C>) {
    if let Err(e) = state::save_state(dir, &dispatcher.lockout_state()) {
        tracing::warn!(error = %e, "could not save lockout state");
    }
}

/// Turn a failed or frozen response into an error for the CLI.
pub fn ensure_ok(response: Response) -> Result<Response> {
    if response.is_frozen() {
        let seconds_remaining = match &response {
            Response::Status(s) => s.seconds_remaining,
            Response::Entry(e) => e.seconds_remaining,
        };
        return Err(UpassError::Frozen {
            seconds_remaining: seconds_remaining.unwrap_or(1),
        });
    }
    if let Response::Status(s) = &response {
        if s.status == Status::Error {
            let message = s.message.clone().unwrap_or_else(|| "request failed".into());
            return Err(UpassError::CommandFailed(message));
        }
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{EntryResponse, StatusResponse};

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "upass",
            "--config-dir",
            "/tmp/x",
            "get",
            "example.com",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(config_dir(&cli).unwrap(), PathBuf::from("/tmp/x"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Get { ref site } if site == "example.com"));
    }

    #[test]
    fn backend_url_flag_overrides_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from([
            "upass",
            "--config-dir",
            dir.path().to_str().unwrap(),
            "--backend-url",
            "http://10.1.1.1:9999",
            "status",
        ])
        .unwrap();
        assert_eq!(load_settings(&cli).unwrap().backend_url, "http://10.1.1.1:9999");
    }

    #[test]
    fn ensure_ok_maps_frozen_and_errors() {
        let frozen = Response::frozen(&Request::ExportToUsb, 12);
        assert!(matches!(
            ensure_ok(frozen),
            Err(UpassError::Frozen {
                seconds_remaining: 12
            })
        ));
        assert!(matches!(
            ensure_ok(Response::error("nope")),
            Err(UpassError::CommandFailed(m)) if m == "nope"
        ));
        assert!(ensure_ok(Response::Status(StatusResponse::new(Status::Ok, "fine"))).is_ok());
        assert!(ensure_ok(Response::Entry(EntryResponse::empty("missing"))).is_ok());
    }
}
