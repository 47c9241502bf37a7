//! `upass export` — write every credential as a plain-text backup.
//!
//! The output is NOT encrypted.  Files are created owner-only.

use std::path::Path;

use crate::cli::output;
use crate::cli::{dispatch_once, ensure_ok, Cli};
use crate::config::master_key::write_private;
use crate::dispatch::{Request, Response};
use crate::errors::{Result, UpassError};

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&Path>) -> Result<()> {
    let content = match ensure_ok(dispatch_once(cli, Request::ExportToUsb)?)? {
        Response::Status(s) => s.content.unwrap_or_default(),
        Response::Entry(_) => return Err(UpassError::CommandFailed("unexpected reply".into())),
    };

    match output_path {
        Some(dest) => {
            write_private(dest, content.as_bytes()).map_err(|e| {
                UpassError::CommandFailed(format!("failed to write export file: {e}"))
            })?;
            output::success(&format!("Exported credentials to {}", dest.display()));
            output::warning("The export file is not encrypted. Store it somewhere safe.");
        }
        None => {
            // Write to stdout (no success message, just raw output).
            print!("{content}");
        }
    }

    Ok(())
}
