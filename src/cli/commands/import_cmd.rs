//! `upass import` — import credentials from a backup file.
//!
//! Supported formats (auto-detected from content):
//! - the plain-text output of `upass export`
//! - a JSON array of `{site, username, password}` objects

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{dispatch_once, ensure_ok, Cli};
use crate::dispatch::{Request, Response};
use crate::errors::{Result, UpassError};
use crate::vault::{backup, CredentialEntry};

/// Execute the `import` command.
pub fn execute(cli: &Cli, source: &Path) -> Result<()> {
    if !source.exists() {
        return Err(UpassError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    let content = Zeroizing::new(fs::read_to_string(source)?);
    let entries = parse_import(&content)?;

    if entries.is_empty() {
        output::warning("No credentials found in the import file.");
        return Ok(());
    }

    let response = ensure_ok(dispatch_once(cli, Request::ImportFromUsb { data: entries })?)?;
    let count = match response {
        Response::Status(s) => s.count.unwrap_or(0),
        Response::Entry(_) => 0,
    };

    output::success(&format!(
        "Imported {count} credentials from {}",
        source.display()
    ));
    Ok(())
}

/// Parse either import format.
fn parse_import(content: &str) -> Result<Vec<CredentialEntry>> {
    if content.trim_start().starts_with('[') {
        serde_json::from_str(content)
            .map_err(|e| UpassError::InvalidInput(format!("invalid JSON import: {e}")))
    } else {
        Ok(backup::parse(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array() {
        let entries =
            parse_import(r#"[{"site": "a.com", "username": "u", "password": "p"}]"#).unwrap();
        assert_eq!(entries, vec![CredentialEntry::new("a.com", "u", "p")]);
    }

    #[test]
    fn parses_text_backup() {
        let text = backup::render(&[CredentialEntry::new("a.com", "u", "p")]);
        assert_eq!(parse_import(&text).unwrap().len(), 1);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_import("[{\"site\": 1}]").is_err());
    }
}
