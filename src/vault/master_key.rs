//! Master Key Provider
//! Mission: Load, validate, and hold the process-wide encryption key
//!
//! The key is configured once per process as a base64-encoded 256-bit value
//! (`MASTER_ENCRYPTION_KEY`). The decoded bytes live inside an opaque
//! `KeyHandle` that only the encryptor can read; they are wiped on drop and
//! redacted from debug output. Tests construct handles directly from base64
//! so no global state leaks between them.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use std::env;
use zeroize::Zeroize;

use crate::vault::error::VaultError;

/// Environment variable holding the base64-encoded master key.
pub const MASTER_KEY_ENV: &str = "MASTER_ENCRYPTION_KEY";

/// Master key length in bytes (AES-256).
const MASTER_KEY_LEN: usize = 32;

/// Opaque handle to the process master key.
///
/// Immutable after construction and safe to share across threads. There is no
/// public accessor for the raw bytes; encryption and decryption consume the
/// handle through a crate-private view.
#[derive(Clone)]
pub struct KeyHandle {
    key: [u8; MASTER_KEY_LEN],
}

impl KeyHandle {
    /// Load the master key from `MASTER_ENCRYPTION_KEY`.
    pub fn load_from_env() -> Result<Self, VaultError> {
        let encoded = env::var(MASTER_KEY_ENV).map_err(|_| {
            VaultError::Configuration(format!(
                "{} is not set. Generate one with: tradevault generate-master-key",
                MASTER_KEY_ENV
            ))
        })?;
        Self::from_base64(&encoded)
    }

    /// Build a handle from a base64-encoded 32-byte value.
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let mut decoded = BASE64.decode(encoded.trim()).map_err(|_| {
            VaultError::Configuration(format!(
                "{} is not valid base64; expected a base64-encoded 32-byte value",
                MASTER_KEY_ENV
            ))
        })?;

        if decoded.len() != MASTER_KEY_LEN {
            let got = decoded.len();
            decoded.zeroize();
            return Err(VaultError::Configuration(format!(
                "{} must decode to exactly {} bytes, got {}",
                MASTER_KEY_ENV, MASTER_KEY_LEN, got
            )));
        }

        let mut key = [0u8; MASTER_KEY_LEN];
        key.copy_from_slice(&decoded);
        decoded.zeroize();

        Ok(Self { key })
    }

    /// Generate a fresh base64-encoded 256-bit key for an operator to install.
    ///
    /// Pure utility: touches no running state. Uses the system CSPRNG.
    pub fn generate_base64() -> Result<String, VaultError> {
        let rng = SystemRandom::new();
        let mut key = [0u8; MASTER_KEY_LEN];
        rng.fill(&mut key)
            .map_err(|_| VaultError::Configuration("system CSPRNG unavailable".to_string()))?;

        let encoded = BASE64.encode(key);
        key.zeroize();
        Ok(encoded)
    }

    /// Raw key bytes, visible only to the encryptor.
    pub(crate) fn bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.key
    }
}

impl Drop for KeyHandle {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyHandle(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_round_trips() {
        let encoded = KeyHandle::generate_base64().unwrap();
        let handle = KeyHandle::from_base64(&encoded).unwrap();
        assert_eq!(handle.bytes().len(), 32);
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let k1 = KeyHandle::generate_base64().unwrap();
        let k2 = KeyHandle::generate_base64().unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_non_base64_value_rejected() {
        let result = KeyHandle::from_base64("not-valid-base64!!!");
        assert!(matches!(result, Err(VaultError::Configuration(_))));
    }

    #[test]
    fn test_short_key_rejected() {
        // 31 bytes
        let encoded = BASE64.encode([0x42u8; 31]);
        let result = KeyHandle::from_base64(&encoded);
        assert!(matches!(result, Err(VaultError::Configuration(_))));
    }

    #[test]
    fn test_long_key_rejected() {
        // 33 bytes
        let encoded = BASE64.encode([0x42u8; 33]);
        let result = KeyHandle::from_base64(&encoded);
        assert!(matches!(result, Err(VaultError::Configuration(_))));
    }

    #[test]
    fn test_exact_32_byte_key_accepted() {
        let encoded = BASE64.encode([0x42u8; 32]);
        let handle = KeyHandle::from_base64(&encoded).unwrap();
        assert_eq!(handle.bytes(), &[0x42u8; 32]);
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        let encoded = format!("  {}\n", BASE64.encode([0x07u8; 32]));
        assert!(KeyHandle::from_base64(&encoded).is_ok());
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let handle = KeyHandle::from_base64(&BASE64.encode([0x42u8; 32])).unwrap();
        let debug = format!("{:?}", handle);
        assert!(!debug.contains("42"));
        assert!(debug.contains("redacted"));
    }
}
