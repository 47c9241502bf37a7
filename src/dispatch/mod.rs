//! Request dispatcher.
//!
//! Turns one UI `Request` into exactly one `Response`.  The lockout
//! guard sits in front of every action, the master key is loaded fresh
//! for every request, and every outcome is written to the audit sink.
//!
//! - `messages`: the request/response wire types
//! - `channel`: a handle that runs a dispatcher on its own thread

pub mod channel;
pub mod messages;

pub use channel::DispatcherHandle;
pub use messages::{EntryResponse, Request, Response, Status, StatusResponse};

use crate::audit::AuditSink;
use crate::backend::Backend;
use crate::config::MasterKeyStore;
use crate::errors::{Result, UpassError};
use crate::lockout::{Clock, LockoutGuard, LockoutState, LockoutStatus, SystemClock};
use crate::vault::{CredentialEntry, CredentialStore, InitStatus, LookupOutcome, SaveOutcome};

use messages::NOT_FOUND;

/// Owns the store, the lockout guard, the key source and the audit sink.
pub struct Dispatcher<B, C = SystemClock> {
    store: CredentialStore<B>,
    guard: LockoutGuard<C>,
    keys: Box<dyn MasterKeyStore>,
    audit: Option<Box<dyn AuditSink>>,
}

impl<B: Backend, C: Clock> Dispatcher<B, C> {
    pub fn new(
        store: CredentialStore<B>,
        guard: LockoutGuard<C>,
        keys: Box<dyn MasterKeyStore>,
    ) -> Self {
        Self {
            store,
            guard,
            keys,
            audit: None,
        }
    }

    /// Record every dispatched action to `sink`.
    pub fn with_audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn store(&self) -> &CredentialStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CredentialStore<B> {
        &mut self.store
    }

    /// Current guard state, for persisting between runs.
    pub fn lockout_state(&mut self) -> LockoutState {
        self.guard.state()
    }

    pub fn lockout_status(&mut self) -> LockoutStatus {
        self.guard.status()
    }

    /// Handle one request.  Never panics, never returns without a response.
    pub fn handle(&mut self, request: Request) -> Response {
        tracing::debug!(action = request.action(), site = ?request.site(), "dispatch");

        let response = match self.guard.check() {
            Err(UpassError::Frozen { seconds_remaining }) => {
                Response::frozen(&request, seconds_remaining)
            }
            _ => self.run(&request),
        };

        if let Some(audit) = &self.audit {
            audit.record(request.action(), request.site(), response.outcome());
        }
        response
    }

    fn run(&mut self, request: &Request) -> Response {
        let key = match self.keys.load() {
            Ok(key) => key,
            Err(e) => return Response::failure(request, e.to_string()),
        };
        let key = match (request, key) {
            (Request::CheckAndInitUsb, key) => return self.check_and_init(key.as_deref()),
            (_, Some(key)) => key,
            (_, None) => {
                return Response::failure(request, UpassError::MissingMasterKey.to_string())
            }
        };

        let result = match request {
            Request::SavePassword {
                site,
                username,
                password,
                force,
            } => self.save(&key, site, username, password, *force),
            Request::GetPassword { site } => self.lookup(&key, site),
            Request::ImportFromUsb { data } => self.import(&key, data),
            Request::ExportToUsb => self.export(&key),
            Request::CheckAndInitUsb => return self.check_and_init(Some(&*key)),
        };

        match result {
            Ok(response) => {
                self.guard.record_success();
                response
            }
            Err(e)
                if e.is_decryption_failure()
                    && matches!(request, Request::GetPassword { .. }) =>
            {
                match self.guard.record_failure() {
                    LockoutStatus::Frozen { seconds_remaining } => {
                        Response::frozen(request, seconds_remaining)
                    }
                    LockoutStatus::Open { .. } => {
                        Response::failure(request, UpassError::DecryptionFailed.to_string())
                    }
                }
            }
            Err(e) => {
                tracing::debug!(action = request.action(), error = %e, "action failed");
                Response::failure(request, e.to_string())
            }
        }
    }

    fn save(
        &mut self,
        key: &str,
        site: &str,
        username: &str,
        password: &str,
        force: bool,
    ) -> Result<Response> {
        let entry = CredentialEntry::new(site, username, password);
        Ok(match self.store.save(key, entry, force)? {
            SaveOutcome::Inserted => Response::status(Status::Success, "Password saved"),
            SaveOutcome::Overwritten => Response::status(Status::Overwritten, "Password updated"),
            SaveOutcome::Conflict => Response::status(
                Status::Exists,
                UpassError::Conflict(site.to_string()).to_string(),
            ),
        })
    }

    fn lookup(&mut self, key: &str, site: &str) -> Result<Response> {
        Ok(match self.store.lookup(key, site)? {
            LookupOutcome::Found(entry) => Response::Entry(EntryResponse::found(entry.login())),
            LookupOutcome::NotFound => Response::Entry(EntryResponse::empty(NOT_FOUND)),
        })
    }

    fn import(&mut self, key: &str, data: &[CredentialEntry]) -> Result<Response> {
        let count = self.store.import_bulk(key, data.to_vec())?;
        Ok(Response::Status(StatusResponse {
            count: Some(count),
            ..StatusResponse::new(Status::Imported, format!("Imported {count} passwords"))
        }))
    }

    fn export(&mut self, key: &str) -> Result<Response> {
        let content = self.store.export_all(key)?;
        Ok(Response::Status(StatusResponse {
            content: Some(content),
            ..StatusResponse::new(Status::Success, "Passwords exported")
        }))
    }

    /// Does not prove the key, so it neither counts as a failure nor
    /// resets the guard.
    fn check_and_init(&mut self, key: Option<&String>) -> Response {
        match self.store.check_and_init(key.map(String::as_str)) {
            Ok(InitStatus::Ok) => Response::status(Status::Ok, "USB storage ready"),
            Ok(InitStatus::UsbMissing) => Response::status(
                Status::UsbMissing,
                "No USB drive found. Insert the drive and try again.",
            ),
            Ok(InitStatus::MissingKey) => Response::status(
                Status::MissingKey,
                UpassError::MissingMasterKey.to_string(),
            ),
            Ok(InitStatus::Created) => {
                Response::status(Status::Created, "Created an encrypted password database")
            }
            Ok(InitStatus::Encrypted) => {
                Response::status(Status::Encrypted, "Encrypted the existing password database")
            }
            Err(e) => Response::error(e.to_string()),
        }
    }
}
