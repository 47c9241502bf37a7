//! Credential types and site normalization.
//!
//! A `CredentialEntry` is the clear-text triple the user works with.
//! Only its `Login` half (username + password) is ever encrypted; the
//! site is the lookup key and travels in the clear next to the envelope.

use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, UpassError};

/// A site/username/password triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub site: String,
    pub username: String,
    pub password: String,
}

impl CredentialEntry {
    pub fn new(
        site: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Normalize the site and reject empty fields or fields with line
    /// breaks, which the backup format cannot carry.
    pub fn normalized(self) -> Result<Self> {
        for (name, value) in [("username", &self.username), ("password", &self.password)] {
            if value.contains(['\r', '\n']) {
                return Err(UpassError::InvalidInput(format!(
                    "{name} for '{}' must not contain line breaks",
                    self.site
                )));
            }
        }
        if self.username.is_empty() {
            return Err(UpassError::InvalidInput(format!(
                "username is required for '{}'",
                self.site
            )));
        }
        if self.password.is_empty() {
            return Err(UpassError::InvalidInput(format!(
                "password is required for '{}'",
                self.site
            )));
        }
        Ok(Self {
            site: normalize_site(&self.site)?,
            ..self
        })
    }

    /// Split off the part that gets encrypted.
    pub fn login(&self) -> Login {
        Login {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// The encrypted payload of one stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// Reduce a URL or host to the bare hostname used as the lookup key.
///
/// `https://www.Example.com:8443/login?x=1` becomes `example.com`.
/// Input without a scheme is read as an `http://` URL. IPv6 literals keep
/// their brackets and internationalized names come back in punycode.
pub fn normalize_site(raw: &str) -> Result<String> {
    let invalid = || UpassError::InvalidInput(format!("'{raw}' does not contain a site name"));

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let url = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{trimmed}"))
    }
    .map_err(|_| invalid())?;

    let host = url.host_str().ok_or_else(invalid)?;
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    if host.is_empty() {
        return Err(invalid());
    }
    Ok(host)
}
