//! `upass init` — check the storage device and provision its database.

use crate::cli::output;
use crate::cli::{dispatch_once, ensure_ok, Cli};
use crate::dispatch::{Request, Response, Status};
use crate::errors::{Result, UpassError};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let reply = match ensure_ok(dispatch_once(cli, Request::CheckAndInitUsb)?)? {
        Response::Status(s) => s,
        Response::Entry(_) => return Err(UpassError::CommandFailed("unexpected reply".into())),
    };
    let message = reply.message.unwrap_or_default();

    match reply.status {
        Status::Ok | Status::Created | Status::Encrypted => output::success(&message),
        Status::UsbMissing | Status::MissingKey => output::warning(&message),
        _ => output::info(&message),
    }
    Ok(())
}
