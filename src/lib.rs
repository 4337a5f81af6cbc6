//! TradeVault Backend Library
//!
//! Encrypted credential vault for exchange API keys, plus the HTTP consumer
//! boundary. Exposed for the `tradevault` binary and the integration tests.

pub mod api;
pub mod vault;

pub use vault::{CredentialStore, KeyHandle, VaultError};
