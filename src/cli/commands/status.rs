//! `upass status` — storage device, master key and lockout at a glance.

use crate::cli::output;
use crate::cli::{build_dispatcher, Cli};
use crate::errors::Result;
use crate::lockout::LockoutStatus;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let keys = crate::cli::key_source(cli)?;
    let key_set = keys.load()?.is_some();

    let mut dispatcher = build_dispatcher(cli)?;
    let lockout = dispatcher.lockout_status();
    let storage = dispatcher.store_mut().storage_status();

    let mut rows = vec![("Master key", yes_no(key_set).to_string())];
    rows.push((
        "Lockout",
        match lockout {
            LockoutStatus::Open { fail_count: 0 } => "open".to_string(),
            LockoutStatus::Open { fail_count } => format!("open ({fail_count} recent failures)"),
            LockoutStatus::Frozen { seconds_remaining } => {
                format!("frozen ({seconds_remaining}s remaining)")
            }
        },
    ));

    match &storage {
        Ok(s) => {
            rows.push(("Backend", "reachable".to_string()));
            rows.push(("USB drive", yes_no(s.usb_found).to_string()));
            rows.push(("Database", yes_no(s.db_exists).to_string()));
            rows.push(("Encrypted", yes_no(s.encrypted).to_string()));
            if let Some(path) = &s.db_path {
                rows.push(("Database path", path.clone()));
            }
        }
        Err(e) => rows.push(("Backend", format!("unreachable ({e})"))),
    }
    rows.push(("Backend URL", dispatcher.store().backend().base_url().to_string()));

    output::print_status_table(&rows);

    if storage.is_err() {
        output::tip("Is the storage service running? See `backend_url` in upass.toml.");
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
