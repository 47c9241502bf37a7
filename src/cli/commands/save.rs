//! `upass save` — store credentials for a site.

use std::io::{self, IsTerminal, Read};

use dialoguer::Confirm;
use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{dispatch_once, ensure_ok, Cli};
use crate::dispatch::{Request, Response, Status};
use crate::errors::{Result, UpassError};

/// Execute the `save` command.
pub fn execute(
    cli: &Cli,
    site: &str,
    username: &str,
    password: Option<&str>,
    force: bool,
) -> Result<()> {
    // Determine the password from one of three sources.
    let password = Zeroizing::new(if let Some(p) = password {
        // Source 1: Inline value on the command line.
        output::warning("Password provided on command line — it may appear in shell history.");
        p.to_string()
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        // Source 3: Interactive secure prompt (default).
        dialoguer::Password::new()
            .with_prompt(format!("Password for {username} on {site}"))
            .interact()
            .map_err(|e| UpassError::CommandFailed(format!("input prompt: {e}")))?
    });

    let request = |force| Request::SavePassword {
        site: site.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        force,
    };

    let mut response = ensure_ok(dispatch_once(cli, request(force))?)?;

    if status_of(&response) == Some(Status::Exists) {
        if !io::stdin().is_terminal() {
            return Err(UpassError::Conflict(site.to_string()));
        }
        let overwrite = Confirm::new()
            .with_prompt(format!("Credentials for '{site}' already exist. Overwrite?"))
            .default(false)
            .interact()
            .map_err(|e| UpassError::CommandFailed(format!("confirm prompt: {e}")))?;
        if !overwrite {
            return Err(UpassError::UserCancelled);
        }
        response = ensure_ok(dispatch_once(cli, request(true))?)?;
    }

    match status_of(&response) {
        Some(Status::Overwritten) => output::success(&format!("Credentials updated for {site}")),
        _ => output::success(&format!("Credentials saved for {site}")),
    }
    Ok(())
}

fn status_of(response: &Response) -> Option<Status> {
    match response {
        Response::Status(s) => Some(s.status),
        Response::Entry(_) => None,
    }
}
