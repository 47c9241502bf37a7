//! Plain-text backup format for `export` and `import`.
//!
//! ```text
//! === Saved Passwords ===
//!
//! Entry #1
//! Website: example.com
//! Username: alice
//! Password: hunter2
//!
//! === Total: 1 passwords ===
//! ```
//!
//! An empty store renders as the single `NO_ENTRIES_MARKER` line.  The
//! output is meant for offline backup and is NOT encrypted.

use super::entry::CredentialEntry;

/// What `render` produces for an empty store.
pub const NO_ENTRIES_MARKER: &str = "=== No saved passwords ===";

const HEADER: &str = "=== Saved Passwords ===";

/// Render entries in the order given.
///
/// Field values are written verbatim after a single separator space.
pub fn render(entries: &[CredentialEntry]) -> String {
    if entries.is_empty() {
        return format!("{NO_ENTRIES_MARKER}\n");
    }

    let mut lines = vec![HEADER.to_string(), String::new()];
    for (i, entry) in entries.iter().enumerate() {
        lines.push(format!("Entry #{}", i + 1));
        lines.push(format!("Website: {}", entry.site));
        lines.push(format!("Username: {}", entry.username));
        lines.push(format!("Password: {}", entry.password));
        lines.push(String::new());
    }
    lines.push(format!("=== Total: {} passwords ===", entries.len()));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Read entries back out of a backup.
///
/// A record is emitted once `Website:`, `Username:` and `Password:` have
/// all been seen; anything else (headers, numbering, blank lines) is
/// ignored.  Sites are returned as written, not normalized.  Usernames
/// and passwords keep any leading or trailing whitespace past the one
/// separator space.
pub fn parse(text: &str) -> Vec<CredentialEntry> {
    let mut entries = Vec::new();
    let mut site: Option<String> = None;
    let mut username: Option<String> = None;

    for line in text.lines() {
        let line = line.trim_start();
        if let Some(value) = line.strip_prefix("Website:") {
            site = Some(value.trim().to_string());
            username = None;
        } else if let Some(value) = line.strip_prefix("Username:") {
            username = Some(field_value(value).to_string());
        } else if let Some(value) = line.strip_prefix("Password:") {
            if let (Some(s), Some(u)) = (site.take(), username.take()) {
                let password = field_value(value);
                if !s.is_empty() && !u.is_empty() && !password.is_empty() {
                    entries.push(CredentialEntry::new(s, u, password));
                }
            }
        }
    }

    entries
}

fn field_value(rest: &str) -> &str {
    rest.strip_prefix(' ').unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_renders_marker() {
        assert_eq!(render(&[]), format!("{NO_ENTRIES_MARKER}\n"));
    }

    #[test]
    fn single_entry_renders_fields_verbatim() {
        let out = render(&[CredentialEntry::new("x.com", "alice", "p@ss word")]);
        assert_eq!(
            out,
            "=== Saved Passwords ===\n\
             \n\
             Entry #1\n\
             Website: x.com\n\
             Username: alice\n\
             Password: p@ss word\n\
             \n\
             === Total: 1 passwords ===\n"
        );
    }

    #[test]
    fn parse_reads_rendered_output() {
        let entries = vec![
            CredentialEntry::new("a.com", "alice", "one"),
            CredentialEntry::new("b.org", "bob", "two"),
        ];
        assert_eq!(parse(&render(&entries)), entries);
    }

    #[test]
    fn parse_keeps_surrounding_whitespace() {
        let entries = vec![
            CredentialEntry::new("a.com", " alice", "  pw with spaces  "),
            CredentialEntry::new("b.org", "bob ", "\ttab"),
        ];
        assert_eq!(parse(&render(&entries)), entries);
    }

    #[test]
    fn parse_accepts_crlf_line_endings() {
        let text = "Website: a.com\r\nUsername: alice\r\nPassword: pw \r\n";
        assert_eq!(parse(text), vec![CredentialEntry::new("a.com", "alice", "pw ")]);
    }

    #[test]
    fn parse_skips_incomplete_records() {
        let text = "Website: a.com\nPassword: orphan\nWebsite: b.com\nUsername: bob\nPassword: ok\n";
        let entries = parse(text);
        assert_eq!(entries, vec![CredentialEntry::new("b.com", "bob", "ok")]);
    }

    #[test]
    fn parse_of_marker_is_empty() {
        assert!(parse(NO_ENTRIES_MARKER).is_empty());
    }
}
