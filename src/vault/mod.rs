//! Encrypted Credential Vault
//! Mission: Store exchange API credentials so the secret part is never
//! persisted or returned in cleartext, except to the owner via `reveal`
//!
//! Three layers, leaves first:
//! - `master_key`: loads and holds the process-wide AES-256 key as an opaque
//!   `KeyHandle`
//! - `encryptor`: pure AES-256-GCM encrypt/decrypt of a credential pair
//! - `store`: owner-scoped persistence of credential records over SQLite
//!
//! Consumers of `reveal` must never cache, log, or persist the returned
//! plaintext; the vault cannot enforce that past its own boundary.

pub mod encryptor;
pub mod error;
pub mod master_key;
pub mod models;
pub mod store;

pub use encryptor::EncryptedCredentials;
pub use error::VaultError;
pub use master_key::{KeyHandle, MASTER_KEY_ENV};
pub use models::{CredentialRecord, CredentialSummary, Exchange, PlaintextCredentials};
pub use store::CredentialStore;
