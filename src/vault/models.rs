//! Vault Data Models
//! Mission: Define the credential record shapes with secrets kept out of reach

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A trading venue. Reference data, created administratively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One stored credential as persisted.
///
/// The secret key exists only inside the encrypted blob; it is never a field
/// of this struct. Ciphertext and nonce are written together and never
/// individually mutated; rotation replaces both with fresh values.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exchange_id: Uuid,
    pub name: String,
    /// Public part of the API key, safe to display.
    pub api_key_public_part: String,
    #[serde(skip_serializing)]
    pub encrypted_credentials: Vec<u8>, // GCM ciphertext + tag - never serialize
    #[serde(skip_serializing)]
    pub nonce: Vec<u8>, // paired 1:1 with the ciphertext - never serialize
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl CredentialRecord {
    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            id: self.id,
            exchange_id: self.exchange_id,
            name: self.name.clone(),
            api_key_public_part: self.api_key_public_part.clone(),
            is_active: self.is_active,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Redacted projection of a credential for listings.
///
/// Carries no ciphertext, nonce, or secret material at all.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub id: Uuid,
    pub exchange_id: Uuid,
    pub name: String,
    pub api_key_public_part: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Decrypted credential pair, alive only inside the reveal call stack.
///
/// Strict decode: unknown or missing fields in the recovered payload are
/// rejected before the caller ever sees a value. `issued_at` is the
/// encryption timestamp embedded in the payload; it is validated
/// structurally but carries no expiry semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaintextCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub issued_at: String,
}
