//! `upass get` — look up and print the credentials for a site.

use crate::cli::output;
use crate::cli::{dispatch_once, ensure_ok, Cli};
use crate::dispatch::{Request, Response};
use crate::errors::{Result, UpassError};

/// Execute the `get` command.
pub fn execute(cli: &Cli, site: &str) -> Result<()> {
    let request = Request::GetPassword {
        site: site.to_string(),
    };

    match ensure_ok(dispatch_once(cli, request)?)? {
        Response::Entry(reply) => match &reply.entry {
            Some(login) => {
                println!("Username: {}", login.username);
                println!("Password: {}", login.password);
                Ok(())
            }
            None if reply.message.as_deref() == Some(crate::dispatch::messages::NOT_FOUND) => {
                output::info(&format!("No credentials saved for {site}"));
                Ok(())
            }
            None => Err(UpassError::CommandFailed(
                reply.message.clone().unwrap_or_else(|| "lookup failed".into()),
            )),
        },
        Response::Status(_) => Err(UpassError::CommandFailed("unexpected reply".into())),
    }
}
