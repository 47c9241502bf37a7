//! `upass audit` — display the audit log.
//!
//! Usage:
//!   upass audit               # show last 50 entries
//!   upass audit --last 20     # show last 20
//!   upass audit --since 7d    # entries from last 7 days

use chrono::Utc;

use crate::cli::Cli;
use crate::errors::{Result, UpassError};

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    use crate::audit::AuditLog;
    use crate::cli::output;

    let config_dir = crate::cli::config_dir(cli)?;
    std::fs::create_dir_all(&config_dir)?;

    let audit = AuditLog::open(&config_dir)
        .ok_or_else(|| UpassError::AuditError("failed to open audit database".into()))?;

    let since_dt = match since {
        Some(s) => Some(parse_duration(s)?),
        None => None,
    };

    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);

    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(_cli: &Cli, _last: usize, since: Option<&str>) -> Result<()> {
    if let Some(s) = since {
        parse_duration(s)?;
    }
    Err(UpassError::AuditError(
        "audit log not compiled — rebuild with `--features audit-log`".into(),
    ))
}

/// Parse a human-friendly duration string like "7d", "24h", "30m".
fn parse_duration(input: &str) -> Result<chrono::DateTime<Utc>> {
    let input = input.trim();

    let (num_str, unit) = if let Some(s) = input.strip_suffix('d') {
        (s, 'd')
    } else if let Some(s) = input.strip_suffix('h') {
        (s, 'h')
    } else if let Some(s) = input.strip_suffix('m') {
        (s, 'm')
    } else {
        return Err(UpassError::CommandFailed(format!(
            "invalid duration '{input}' — use format like 7d, 24h, or 30m"
        )));
    };

    let num: i64 = num_str.parse().map_err(|_| {
        UpassError::CommandFailed(format!(
            "invalid duration '{input}' — number part is not valid"
        ))
    })?;

    let duration = match unit {
        'd' => chrono::Duration::try_days(num),
        'h' => chrono::Duration::try_hours(num),
        _ => chrono::Duration::try_minutes(num),
    }
    .ok_or_else(|| UpassError::CommandFailed(format!("duration '{input}' is out of range")))?;

    Ok(Utc::now() - duration)
}

/// Print audit entries in a formatted table.
#[cfg(feature = "audit-log")]
pub fn print_audit_table(entries: &[crate::audit::AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Action", "Site", "Outcome"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.action.clone(),
            entry.site.clone().unwrap_or_else(|| "-".into()),
            colorize_outcome(&entry.outcome),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

/// Colorize outcomes for display.
#[cfg_attr(not(feature = "audit-log"), allow(dead_code))]
fn colorize_outcome(outcome: &str) -> String {
    use console::style;

    match outcome {
        "success" | "found" | "imported" | "ok" | "created" | "encrypted" => {
            style(outcome).green().to_string()
        }
        "overwritten" | "exists" | "notFound" => style(outcome).yellow().to_string(),
        "error" | "frozen" => style(outcome).red().to_string(),
        "usbMissing" | "missingKey" => style(outcome).magenta().to_string(),
        _ => outcome.to_string(),
    }
}
