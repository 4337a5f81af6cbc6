//! Credential Storage
//! Mission: Persist encrypted exchange credentials with SQLite, owner-scoped
//!
//! The store never holds plaintext secrets: `create` and `rotate` pass them
//! straight through the encryptor, and `reveal` decrypts on demand for the
//! owning user only. Uniqueness of (owner, exchange, name) is enforced by a
//! `UNIQUE` constraint at the storage layer, so concurrent creates serialize
//! there: first writer wins, the second surfaces `DuplicateName`.

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{info, warn};
use uuid::Uuid;

use crate::vault::encryptor;
use crate::vault::error::VaultError;
use crate::vault::master_key::KeyHandle;
use crate::vault::models::{CredentialRecord, CredentialSummary, Exchange, PlaintextCredentials};

/// Credential storage with SQLite backend.
pub struct CredentialStore {
    db_path: String,
    key: KeyHandle,
}

impl CredentialStore {
    /// Create a new credential store and initialize the schema.
    pub fn new(db_path: &str, key: KeyHandle) -> Result<Self, VaultError> {
        let store = Self {
            db_path: db_path.to_string(),
            key,
        };
        store.init_db()?;
        Ok(store)
    }

    fn conn(&self) -> Result<Connection, VaultError> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Initialize database schema.
    fn init_db(&self) -> Result<(), VaultError> {
        let conn = self.conn()?;

        // Exchanges table (reference data)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS exchanges (
                id TEXT PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Credentials table; ciphertext and nonce are opaque blobs
        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_credentials (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                exchange_id TEXT NOT NULL,
                name TEXT NOT NULL,
                api_key_public_part TEXT NOT NULL,
                encrypted_credentials BLOB NOT NULL,
                nonce BLOB NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, exchange_id, name),
                FOREIGN KEY (exchange_id) REFERENCES exchanges(id)
            )",
            [],
        )?;

        Ok(())
    }

    // ─── Exchanges ───────────────────────────────────────────────────────

    /// Register a new exchange. Names are unique.
    pub fn create_exchange(&self, name: &str) -> Result<Exchange, VaultError> {
        let now = Utc::now().to_rfc3339();
        let exchange = Exchange {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO exchanges (id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                exchange.id.to_string(),
                exchange.name,
                exchange.created_at,
                exchange.updated_at,
            ],
        )
        .map_err(|e| map_unique_violation(e, name))?;

        info!("🏦 Registered exchange: {}", exchange.name);
        Ok(exchange)
    }

    /// List all exchanges, ordered by name.
    pub fn list_exchanges(&self) -> Result<Vec<Exchange>, VaultError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at, updated_at FROM exchanges ORDER BY name",
        )?;

        let exchanges = stmt
            .query_map([], |row| {
                Ok(Exchange {
                    id: uuid_column(row.get::<_, String>(0)?)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(exchanges)
    }

    // ─── Credentials ─────────────────────────────────────────────────────

    /// Encrypt and store a new credential pair for `owner`.
    ///
    /// Only the public key part is persisted in cleartext.
    pub fn create(
        &self,
        owner: Uuid,
        exchange_id: Uuid,
        name: &str,
        api_key: &str,
        secret_key: &str,
    ) -> Result<CredentialRecord, VaultError> {
        let conn = self.conn()?;

        let exchange_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM exchanges WHERE id = ?1)",
            params![exchange_id.to_string()],
            |row| row.get(0),
        )?;
        if !exchange_exists {
            return Err(VaultError::NotFound);
        }

        let encrypted = encryptor::encrypt(&self.key, api_key, secret_key)?;

        let now = Utc::now().to_rfc3339();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            user_id: owner,
            exchange_id,
            name: name.to_string(),
            api_key_public_part: api_key.to_string(),
            encrypted_credentials: encrypted.ciphertext,
            nonce: encrypted.nonce.to_vec(),
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO api_credentials
             (id, user_id, exchange_id, name, api_key_public_part,
              encrypted_credentials, nonce, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id.to_string(),
                record.user_id.to_string(),
                record.exchange_id.to_string(),
                record.name,
                record.api_key_public_part,
                record.encrypted_credentials,
                record.nonce,
                record.is_active,
                record.created_at,
                record.updated_at,
            ],
        )
        .map_err(|e| map_unique_violation(e, name))?;

        info!("🔐 Stored credential '{}' for user {}", record.name, owner);
        Ok(record)
    }

    /// List the caller's credentials, redacted.
    ///
    /// SQL projection: the ciphertext and nonce columns are never selected.
    pub fn list(&self, owner: Uuid) -> Result<Vec<CredentialSummary>, VaultError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, exchange_id, name, api_key_public_part, is_active,
                    created_at, updated_at
             FROM api_credentials WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;

        let summaries = stmt
            .query_map(params![owner.to_string()], |row| {
                Ok(CredentialSummary {
                    id: uuid_column(row.get::<_, String>(0)?)?,
                    exchange_id: uuid_column(row.get::<_, String>(1)?)?,
                    name: row.get(2)?,
                    api_key_public_part: row.get(3)?,
                    is_active: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    /// Decrypt the caller's credential and return the plaintext pair.
    ///
    /// The plaintext is never persisted or logged; it lives only in the
    /// returned value. A record owned by someone else is `NotFound`, same as
    /// an absent one.
    pub fn reveal(&self, owner: Uuid, id: Uuid) -> Result<PlaintextCredentials, VaultError> {
        let conn = self.conn()?;
        let record = self.get_record(&conn, owner, id)?;

        encryptor::decrypt(&self.key, &record.encrypted_credentials, &record.nonce).map_err(
            |e| {
                if matches!(e, VaultError::Authentication) {
                    warn!("🚨 Tamper-suspect credential {} (owner {})", id, owner);
                }
                e
            },
        )
    }

    /// Re-encrypt a credential with a new pair and a fresh nonce.
    ///
    /// Public part, ciphertext, and nonce are replaced in one UPDATE; the old
    /// ciphertext is discarded.
    pub fn rotate(
        &self,
        owner: Uuid,
        id: Uuid,
        new_api_key: &str,
        new_secret_key: &str,
    ) -> Result<CredentialRecord, VaultError> {
        let encrypted = encryptor::encrypt(&self.key, new_api_key, new_secret_key)?;

        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE api_credentials
             SET api_key_public_part = ?1, encrypted_credentials = ?2,
                 nonce = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                new_api_key,
                encrypted.ciphertext,
                encrypted.nonce.to_vec(),
                Utc::now().to_rfc3339(),
                id.to_string(),
                owner.to_string(),
            ],
        )?;

        if rows_affected == 0 {
            return Err(VaultError::NotFound);
        }

        info!("🔄 Rotated credential {} for user {}", id, owner);
        self.get_record(&conn, owner, id)
    }

    /// Flip the active flag. Changes bookkeeping state only, not the payload.
    pub fn set_active(
        &self,
        owner: Uuid,
        id: Uuid,
        active: bool,
    ) -> Result<CredentialSummary, VaultError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE api_credentials SET is_active = ?1, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4",
            params![
                active,
                Utc::now().to_rfc3339(),
                id.to_string(),
                owner.to_string(),
            ],
        )?;

        if rows_affected == 0 {
            return Err(VaultError::NotFound);
        }

        Ok(self.get_record(&conn, owner, id)?.summary())
    }

    /// Delete the caller's credential, discarding ciphertext and nonce.
    ///
    /// Deleting an absent or foreign record is `NotFound`, so callers can
    /// tell "already gone" apart from "never had permission" — the vault
    /// reports both identically and leaks nothing across owners.
    pub fn delete(&self, owner: Uuid, id: Uuid) -> Result<(), VaultError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "DELETE FROM api_credentials WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), owner.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(VaultError::NotFound);
        }

        info!("🗑️  Deleted credential {} for user {}", id, owner);
        Ok(())
    }

    /// Fetch one record, owner-scoped. Foreign records look absent.
    fn get_record(
        &self,
        conn: &Connection,
        owner: Uuid,
        id: Uuid,
    ) -> Result<CredentialRecord, VaultError> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, exchange_id, name, api_key_public_part,
                    encrypted_credentials, nonce, is_active, created_at, updated_at
             FROM api_credentials WHERE id = ?1 AND user_id = ?2",
        )?;

        let record = stmt.query_row(params![id.to_string(), owner.to_string()], |row| {
            Ok(CredentialRecord {
                id: uuid_column(row.get::<_, String>(0)?)?,
                user_id: uuid_column(row.get::<_, String>(1)?)?,
                exchange_id: uuid_column(row.get::<_, String>(2)?)?,
                name: row.get(3)?,
                api_key_public_part: row.get(4)?,
                encrypted_credentials: row.get(5)?,
                nonce: row.get(6)?,
                is_active: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
            })
        });

        match record {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(VaultError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// UNIQUE violations mean the name is taken; everything else is storage.
fn map_unique_violation(e: rusqlite::Error, name: &str) -> VaultError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            VaultError::DuplicateName(name.to_string())
        }
        _ => e.into(),
    }
}

fn uuid_column(value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}
