//! Vault Error Types
//! Mission: Tagged error kinds so callers branch on variant, never on strings

/// Errors surfaced by the credential vault.
///
/// Messages never contain key material, nonce values, or plaintext secrets.
#[derive(Debug)]
pub enum VaultError {
    /// Master key missing or invalid. Fatal at startup, never retried.
    Configuration(String),
    /// GCM authentication tag mismatch: tampering or wrong key/nonce.
    Authentication,
    /// Decryption succeeded but the recovered payload is structurally invalid.
    MalformedPayload(String),
    /// (owner, exchange, name) already taken.
    DuplicateName(String),
    /// Record absent, or owned by someone else. Existence must not leak
    /// across owners, so both cases look identical to the caller.
    NotFound,
    /// Underlying SQLite failure.
    Storage(String),
}

impl std::fmt::Display for VaultError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultError::Configuration(msg) => write!(f, "Master key configuration error: {}", msg),
            VaultError::Authentication => {
                write!(f, "Decryption failed: authentication tag mismatch")
            }
            VaultError::MalformedPayload(msg) => {
                write!(f, "Decrypted payload is malformed: {}", msg)
            }
            VaultError::DuplicateName(name) => {
                write!(f, "A credential named '{}' already exists for this exchange", name)
            }
            VaultError::NotFound => write!(f, "Credential not found"),
            VaultError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<rusqlite::Error> for VaultError {
    fn from(e: rusqlite::Error) -> Self {
        VaultError::Storage(e.to_string())
    }
}
