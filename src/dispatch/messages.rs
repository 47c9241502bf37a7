//! Request and response messages exchanged with the UI.
//!
//! Requests are JSON objects tagged by `action`:
//!
//! ```text
//! {"action": "savePassword", "site": "..", "username": "..", "password": "..", "force": false}
//! {"action": "getPassword", "site": ".."}
//! {"action": "importFromUSB", "data": [{"site": "..", "username": "..", "password": ".."}]}
//! {"action": "exportToUSB"}
//! {"action": "checkAndInitUSB"}
//! ```
//!
//! `getPassword` answers with an entry-shaped response, everything else
//! with a status-shaped one.

use serde::{Deserialize, Serialize};

use crate::vault::{CredentialEntry, Login};

/// One UI request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    SavePassword {
        site: String,
        username: String,
        password: String,
        #[serde(default)]
        force: bool,
    },
    GetPassword {
        site: String,
    },
    #[serde(rename = "importFromUSB")]
    ImportFromUsb {
        data: Vec<CredentialEntry>,
    },
    #[serde(rename = "exportToUSB")]
    ExportToUsb,
    #[serde(rename = "checkAndInitUSB")]
    CheckAndInitUsb,
}

impl Request {
    /// The wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            Self::SavePassword { .. } => "savePassword",
            Self::GetPassword { .. } => "getPassword",
            Self::ImportFromUsb { .. } => "importFromUSB",
            Self::ExportToUsb => "exportToUSB",
            Self::CheckAndInitUsb => "checkAndInitUSB",
        }
    }

    /// The site the request is about, if any.
    pub fn site(&self) -> Option<&str> {
        match self {
            Self::SavePassword { site, .. } | Self::GetPassword { site } => Some(site),
            _ => None,
        }
    }
}

// Requests carry passwords; keep them out of debug output and logs.
impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Request");
        s.field("action", &self.action());
        if let Some(site) = self.site() {
            s.field("site", &site);
        }
        if let Self::ImportFromUsb { data } = self {
            s.field("entries", &data.len());
        }
        s.finish_non_exhaustive()
    }
}

/// Status values of a status-shaped response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Success,
    Overwritten,
    Exists,
    Imported,
    Ok,
    UsbMissing,
    MissingKey,
    Created,
    Encrypted,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Overwritten => "overwritten",
            Self::Exists => "exists",
            Self::Imported => "imported",
            Self::Ok => "ok",
            Self::UsbMissing => "usbMissing",
            Self::MissingKey => "missingKey",
            Self::Created => "created",
            Self::Encrypted => "encrypted",
            Self::Error => "error",
        }
    }
}

/// `{status, message?, count?, content?, frozen?, secondsRemaining?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
}

/// `{entry: {username, password} | null, message?, frozen?, secondsRemaining?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub entry: Option<Login>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
}

/// Exactly one of these answers every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Status(StatusResponse),
    Entry(EntryResponse),
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StatusResponse {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            count: None,
            content: None,
            frozen: false,
            seconds_remaining: None,
        }
    }
}

impl EntryResponse {
    pub fn found(login: Login) -> Self {
        Self {
            entry: Some(login),
            message: None,
            frozen: false,
            seconds_remaining: None,
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            entry: None,
            message: Some(message.into()),
            frozen: false,
            seconds_remaining: None,
        }
    }
}

impl Response {
    pub fn status(status: Status, message: impl Into<String>) -> Self {
        Self::Status(StatusResponse::new(status, message))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::status(Status::Error, message)
    }

    /// The refusal sent while the vault is frozen, shaped for `request`.
    pub fn frozen(request: &Request, seconds_remaining: u64) -> Self {
        let message =
            format!("Too many failed attempts. Try again in {seconds_remaining} seconds.");
        match request {
            Request::GetPassword { .. } => Self::Entry(EntryResponse {
                frozen: true,
                seconds_remaining: Some(seconds_remaining),
                ..EntryResponse::empty(message)
            }),
            _ => Self::Status(StatusResponse {
                frozen: true,
                seconds_remaining: Some(seconds_remaining),
                ..StatusResponse::new(Status::Error, message)
            }),
        }
    }

    /// A failure, shaped for `request`.
    pub fn failure(request: &Request, message: impl Into<String>) -> Self {
        match request {
            Request::GetPassword { .. } => Self::Entry(EntryResponse::empty(message)),
            _ => Self::error(message),
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self {
            Self::Status(s) => s.frozen,
            Self::Entry(e) => e.frozen,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Status(s) => s.message.as_deref(),
            Self::Entry(e) => e.message.as_deref(),
        }
    }

    /// Short outcome label for the audit log.
    pub fn outcome(&self) -> &'static str {
        match self {
            _ if self.is_frozen() => "frozen",
            Self::Status(s) => s.status.as_str(),
            Self::Entry(e) if e.entry.is_some() => "found",
            Self::Entry(e) if e.message.as_deref() == Some(NOT_FOUND) => "notFound",
            Self::Entry(_) => "error",
        }
    }
}

/// Message of a `getPassword` response for an unknown site.
pub const NOT_FOUND: &str = "No password saved for this site";
