//! Vault module — credential types and orchestration.
//!
//! This module provides:
//! - `CredentialEntry`, `Login` and site normalization (`entry`)
//! - The plain-text backup format used by export/import (`backup`)
//! - The high-level `CredentialStore` over a storage backend (`store`)

pub mod backup;
pub mod entry;
pub mod store;

// Re-export the most commonly used items.
pub use entry::{normalize_site, CredentialEntry, Login};
pub use store::{CredentialStore, InitStatus, LookupOutcome, SaveOutcome};
