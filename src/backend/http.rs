//! HTTP client for the storage service.
//!
//! Endpoints (all keyed calls carry the hex-encoded derived key):
//!
//! ```text
//! POST /savePassword        {site, iv, ciphertext, masterKey, force}
//! GET  /getPassword/{site}?key=
//! POST /importFromUSB       {items: [{site, iv, ciphertext}], masterKey}
//! GET  /exportToUSB?key=
//! GET  /usbStatus
//! POST /encryptUSB          {masterKey}
//! POST /setupUSB            {masterKey}
//! ```
//!
//! Non-2xx answers never panic or retry: 401, or a 400 whose detail
//! mentions an incorrect passphrase, becomes `DecryptionFailed`;
//! everything else becomes `Transport`.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ureq::http::Response;
use ureq::Body;

use super::{Backend, EncryptOutcome, SaveStatus, SealedCredential, StorageStatus};
use crate::crypto::{DerivedKey, Envelope};
use crate::errors::{Result, UpassError};

/// Client for a storage service at `base_url`.
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest<'a> {
    #[serde(flatten)]
    record: &'a SealedCredential,
    master_key: &'a str,
    force: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest<'a> {
    items: &'a [SealedCredential],
    master_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyRequest<'a> {
    master_key: &'a str,
}

#[derive(Deserialize)]
struct StatusReply<T> {
    status: T,
}

#[derive(Deserialize)]
struct EntryReply {
    entry: Option<Envelope>,
}

#[derive(Deserialize)]
struct ImportReply {
    count: usize,
}

#[derive(Deserialize)]
struct ExportReply {
    items: Vec<SealedCredential>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, key: Option<&DerivedKey>) -> Result<T> {
        let mut request = self.agent.get(&self.url(path));
        if let Some(key) = key {
            request = request.query("key", key.to_hex());
        }
        tracing::debug!(path, "GET");
        let response = request.call().map_err(transport)?;
        read_reply(response)
    }

    fn post<P: Serialize, T: DeserializeOwned>(&self, path: &str, payload: &P) -> Result<T> {
        tracing::debug!(path, "POST");
        let response = self
            .agent
            .post(&self.url(path))
            .send_json(payload)
            .map_err(transport)?;
        read_reply(response)
    }
}

impl Backend for HttpBackend {
    fn status(&mut self) -> Result<StorageStatus> {
        self.get("/usbStatus", None)
    }

    fn setup(&mut self, key: &DerivedKey) -> Result<()> {
        let hex = key.to_hex();
        let _: serde_json::Value = self.post("/setupUSB", &KeyRequest { master_key: &hex })?;
        Ok(())
    }

    fn encrypt_storage(&mut self, key: &DerivedKey) -> Result<EncryptOutcome> {
        let hex = key.to_hex();
        let reply: StatusReply<EncryptOutcome> =
            self.post("/encryptUSB", &KeyRequest { master_key: &hex })?;
        Ok(reply.status)
    }

    fn save(
        &mut self,
        key: &DerivedKey,
        record: &SealedCredential,
        force: bool,
    ) -> Result<SaveStatus> {
        let hex = key.to_hex();
        let reply: StatusReply<SaveStatus> = self.post(
            "/savePassword",
            &SaveRequest {
                record,
                master_key: &hex,
                force,
            },
        )?;
        Ok(reply.status)
    }

    fn fetch(&mut self, key: &DerivedKey, site: &str) -> Result<Option<SealedCredential>> {
        let path = format!("/getPassword/{}", encode_path_segment(site));
        let reply: EntryReply = self.get(&path, Some(key))?;
        Ok(reply.entry.map(|envelope| SealedCredential {
            site: site.to_string(),
            envelope,
        }))
    }

    fn import(&mut self, key: &DerivedKey, records: &[SealedCredential]) -> Result<usize> {
        let hex = key.to_hex();
        let reply: ImportReply = self.post(
            "/importFromUSB",
            &ImportRequest {
                items: records,
                master_key: &hex,
            },
        )?;
        Ok(reply.count)
    }

    fn export(&mut self, key: &DerivedKey) -> Result<Vec<SealedCredential>> {
        let reply: ExportReply = self.get("/exportToUSB", Some(key))?;
        Ok(reply.items)
    }
}

fn transport(err: ureq::Error) -> UpassError {
    UpassError::Transport(err.to_string())
}

fn read_reply<T: DeserializeOwned>(mut response: Response<Body>) -> Result<T> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| UpassError::Transport(format!("malformed reply: {e}")));
    }

    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(classify_failure(status, &body))
}

/// Map a non-2xx reply to an error.
fn classify_failure(status: u16, body: &str) -> UpassError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    let wrong_key = status == 401
        || (status == 400 && detail.to_ascii_lowercase().contains("incorrect passphrase"));
    if wrong_key {
        UpassError::DecryptionFailed
    } else if detail.is_empty() {
        UpassError::Transport(format!("HTTP {status}"))
    } else {
        UpassError::Transport(format!("HTTP {status}: {detail}"))
    }
}

/// Everything outside the RFC 3986 unreserved set gets escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
