//! Key Encryptor
//! Mission: AES-256-GCM encryption of credential pairs, fail-closed on decrypt
//!
//! Every encryption draws a fresh random 96-bit nonce from the system CSPRNG;
//! reuse of a (key, nonce) pair would break GCM entirely. The plaintext is a
//! JSON envelope `{api_key, secret_key, issued_at}` so that swapping two
//! validly encrypted blobs between records is still detectable as a semantic
//! anomaly, on top of GCM's byte-level integrity.
//!
//! Failures are never retried: a tag mismatch means tampering or a wrong key,
//! and neither condition is transient.

use chrono::Utc;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::warn;

use crate::vault::error::VaultError;
use crate::vault::master_key::KeyHandle;
use crate::vault::models::PlaintextCredentials;

/// Output of one encryption: GCM ciphertext with the 16-byte tag appended,
/// plus the nonce that produced it. Both are persisted verbatim.
#[derive(Debug, Clone)]
pub struct EncryptedCredentials {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

/// Encrypt an API credential pair under the master key.
pub fn encrypt(
    key: &KeyHandle,
    api_key: &str,
    secret_key: &str,
) -> Result<EncryptedCredentials, VaultError> {
    let payload = PlaintextCredentials {
        api_key: api_key.to_string(),
        secret_key: secret_key.to_string(),
        issued_at: Utc::now().to_rfc3339(),
    };

    let plaintext = serde_json::to_vec(&payload)
        .map_err(|e| VaultError::MalformedPayload(format!("payload encoding failed: {}", e)))?;

    seal(key, &plaintext)
}

/// Decrypt a stored blob back into the credential pair.
///
/// Fail-closed: any tag mismatch, truncation, or wrong-length nonce yields
/// `Authentication` with no partial plaintext. A blob that authenticates but
/// decodes to an invalid structure yields `MalformedPayload` instead, since
/// that indicates a data-format bug rather than tampering.
pub fn decrypt(
    key: &KeyHandle,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<PlaintextCredentials, VaultError> {
    let nonce_bytes: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| {
        warn!("🚨 Decryption rejected: nonce has wrong length");
        VaultError::Authentication
    })?;

    let plaintext = open(key, &nonce_bytes, ciphertext)?;

    let payload: PlaintextCredentials = serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::MalformedPayload(e.to_string()))?;

    Ok(payload)
}

/// AES-256-GCM seal with a fresh random nonce. Tag is appended in place.
fn seal(key: &KeyHandle, plaintext: &[u8]) -> Result<EncryptedCredentials, VaultError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.bytes())
        .map_err(|_| VaultError::Configuration("failed to build AES-256-GCM key".to_string()))?;
    let sealing_key = LessSafeKey::new(unbound);

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| VaultError::Configuration("system CSPRNG unavailable".to_string()))?;

    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::Configuration("AES-256-GCM encryption failed".to_string()))?;

    Ok(EncryptedCredentials {
        ciphertext: in_out,
        nonce: nonce_bytes,
    })
}

/// AES-256-GCM open. `ciphertext` must carry the appended 16-byte tag.
fn open(
    key: &KeyHandle,
    nonce_bytes: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.bytes())
        .map_err(|_| VaultError::Configuration("failed to build AES-256-GCM key".to_string()))?;
    let opening_key = LessSafeKey::new(unbound);

    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            warn!("🚨 Decryption rejected: authentication tag mismatch");
            VaultError::Authentication
        })?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_key() -> KeyHandle {
        let encoded = KeyHandle::generate_base64().unwrap();
        KeyHandle::from_base64(&encoded).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let key = test_key();

        let encrypted = encrypt(&key, "PUB123", "SECXYZ").unwrap();
        let decrypted = decrypt(&key, &encrypted.ciphertext, &encrypted.nonce).unwrap();

        assert_eq!(decrypted.api_key, "PUB123");
        assert_eq!(decrypted.secret_key, "SECXYZ");
        assert!(!decrypted.issued_at.is_empty());
    }

    #[test]
    fn test_round_trip_awkward_strings() {
        let key = test_key();
        let long_secret = "x".repeat(4096);
        let pairs = [
            ("", ""),
            ("key with spaces", "secret\"with\\quotes"),
            ("ключ", "秘密"),
            ("a", long_secret.as_str()),
        ];

        for (api_key, secret_key) in pairs {
            let encrypted = encrypt(&key, api_key, secret_key).unwrap();
            let decrypted = decrypt(&key, &encrypted.ciphertext, &encrypted.nonce).unwrap();
            assert_eq!(decrypted.api_key, api_key);
            assert_eq!(decrypted.secret_key, secret_key);
        }
    }

    #[test]
    fn test_ciphertext_carries_tag() {
        let key = test_key();
        let encrypted = encrypt(&key, "PUB123", "SECXYZ").unwrap();

        // JSON payload plus the 16-byte GCM tag
        assert!(encrypted.ciphertext.len() > 16);
        assert_eq!(encrypted.nonce.len(), 12);
    }

    #[test]
    fn test_bit_flip_in_ciphertext_fails_closed() {
        let key = test_key();
        let encrypted = encrypt(&key, "PUB123", "SECXYZ").unwrap();

        // Flip one bit in every byte position, body and tag alike
        for pos in 0..encrypted.ciphertext.len() {
            let mut tampered = encrypted.ciphertext.clone();
            tampered[pos] ^= 0x01;

            let result = decrypt(&key, &tampered, &encrypted.nonce);
            assert!(
                matches!(result, Err(VaultError::Authentication)),
                "bit flip at byte {} was not rejected as Authentication",
                pos
            );
        }
    }

    #[test]
    fn test_bit_flip_in_nonce_fails_closed() {
        let key = test_key();
        let encrypted = encrypt(&key, "PUB123", "SECXYZ").unwrap();

        for pos in 0..encrypted.nonce.len() {
            let mut tampered = encrypted.nonce;
            tampered[pos] ^= 0x01;

            let result = decrypt(&key, &encrypted.ciphertext, &tampered);
            assert!(matches!(result, Err(VaultError::Authentication)));
        }
    }

    #[test]
    fn test_wrong_length_nonce_fails_closed() {
        let key = test_key();
        let encrypted = encrypt(&key, "PUB123", "SECXYZ").unwrap();

        let result = decrypt(&key, &encrypted.ciphertext, &encrypted.nonce[..11]);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_truncated_ciphertext_fails_closed() {
        let key = test_key();
        let encrypted = encrypt(&key, "PUB123", "SECXYZ").unwrap();

        let result = decrypt(&key, &encrypted.ciphertext[..8], &encrypted.nonce);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let key_a = test_key();
        let key_b = test_key();

        let encrypted = encrypt(&key_a, "PUB123", "SECXYZ").unwrap();
        let result = decrypt(&key_b, &encrypted.ciphertext, &encrypted.nonce);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_malformed_payload_is_distinct_from_tampering() {
        let key = test_key();

        // Validly encrypted, but the payload is missing secret_key
        let bogus = br#"{"api_key":"PUB123","issued_at":"2026-01-01T00:00:00Z"}"#;
        let sealed = seal(&key, bogus).unwrap();

        let result = decrypt(&key, &sealed.ciphertext, &sealed.nonce);
        assert!(matches!(result, Err(VaultError::MalformedPayload(_))));
    }

    #[test]
    fn test_non_json_payload_is_malformed() {
        let key = test_key();
        let sealed = seal(&key, b"not json at all").unwrap();

        let result = decrypt(&key, &sealed.ciphertext, &sealed.nonce);
        assert!(matches!(result, Err(VaultError::MalformedPayload(_))));
    }

    #[test]
    fn test_unknown_field_in_payload_is_malformed() {
        let key = test_key();
        let bogus =
            br#"{"api_key":"a","secret_key":"b","issued_at":"t","passphrase":"c"}"#;
        let sealed = seal(&key, bogus).unwrap();

        let result = decrypt(&key, &sealed.ciphertext, &sealed.nonce);
        assert!(matches!(result, Err(VaultError::MalformedPayload(_))));
    }

    #[test]
    fn test_nonce_uniqueness_over_100k_encryptions() {
        let key = test_key();
        let mut seen: HashSet<[u8; 12]> = HashSet::with_capacity(100_000);

        for _ in 0..100_000 {
            let encrypted = encrypt(&key, "k", "s").unwrap();
            assert!(
                seen.insert(encrypted.nonce),
                "nonce repeated under the same key"
            );
        }
    }
}
