//! `upass serve` — answer JSON requests on stdin, one per line.
//!
//! Every input line is one request object (see `dispatch::messages`);
//! every output line is its single JSON response.  Lines that do not
//! parse get an error response; the loop stops at end of input.
//! The lockout guard lives in memory for the whole session; its state
//! is saved after every request and again on exit, including when the
//! loop stops on an I/O error.

use std::io::{self, BufRead, Write};

use crate::cli::{build_dispatcher, config_dir, persist_lockout, save_lockout, Cli};
use crate::dispatch::{DispatcherHandle, Request, Response};
use crate::errors::{Result, UpassError};

/// Execute the `serve` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let dir = config_dir(cli)?;
    let (handle, thread) = DispatcherHandle::spawn_with(build_dispatcher(cli)?, move |dispatcher| {
        save_lockout(&dir, dispatcher)
    })?;

    let served = serve_lines(&handle, io::stdin().lock(), io::stdout().lock());

    drop(handle);
    let mut dispatcher = thread
        .join()
        .map_err(|_| UpassError::CommandFailed("dispatcher thread panicked".into()))?;
    persist_lockout(cli, &mut dispatcher);
    served
}

fn serve_lines(handle: &DispatcherHandle, input: impl BufRead, mut output: impl Write) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = answer(handle, &line);
        let json = serde_json::to_string(&response)
            .map_err(|e| UpassError::SerializationError(format!("response: {e}")))?;
        writeln!(output, "{json}")?;
        output.flush()?;
    }
    Ok(())
}

fn answer(handle: &DispatcherHandle, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle
            .call(request)
            .unwrap_or_else(|e| Response::error(e.to_string())),
        Err(e) => Response::error(format!("invalid request: {e}")),
    }
}
