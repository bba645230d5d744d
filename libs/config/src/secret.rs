//! At-rest encryption for secrets and tokens stored in the config file
//!
//! Values are encrypted with AES-256-GCM. The key is derived with
//! PBKDF2-HMAC-SHA256 from an associated string (the API key for key pairs,
//! the context name for session tokens) and a random salt. The associated
//! string is also bound as AEAD associated data, so a ciphertext copied to
//! another context or key does not decrypt.
//!
//! Encrypted values carry [`ENCRYPTION_MARKER`] followed by base64 ciphertext.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{ConfigError, ConfigResult};

/// Prefix marking an encrypted value
pub const ENCRYPTION_MARKER: &str = "AES/GCM/NoPadding";

/// Salt length in bytes
pub const SALT_LEN: usize = 24;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

const KDF_ROUNDS: u32 = 10_000;
const KEY_LEN: usize = 32;

/// Generate a fresh random salt and nonce
pub fn generate_salt_and_nonce() -> (Vec<u8>, Vec<u8>) {
    (generate_salt(), generate_nonce())
}

pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Generate a fresh random nonce. Every encryption of a new plaintext under
/// the same key needs its own.
pub fn generate_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    nonce
}

/// Whether `value` carries the encryption marker
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTION_MARKER)
}

/// Encrypt `plaintext`, binding it to `associated`
pub fn encrypt(associated: &str, plaintext: &str, salt: &[u8], nonce: &[u8]) -> ConfigResult<String> {
    let cipher = cipher(associated, salt)?;
    let nonce = nonce_from(nonce)?;
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext.as_bytes(),
                aad: associated.as_bytes(),
            },
        )
        .map_err(|_| ConfigError::crypto("failed to encrypt secret"))?;

    Ok(format!("{}{}", ENCRYPTION_MARKER, STANDARD.encode(ciphertext)))
}

/// Decrypt a value produced by [`encrypt`] with the same associated string
pub fn decrypt(associated: &str, encrypted: &str, salt: &[u8], nonce: &[u8]) -> ConfigResult<String> {
    let encoded = encrypted
        .strip_prefix(ENCRYPTION_MARKER)
        .ok_or_else(|| ConfigError::crypto("value is not encrypted"))?;
    let ciphertext = STANDARD
        .decode(encoded)
        .map_err(|e| ConfigError::crypto(format!("malformed ciphertext: {e}")))?;

    let cipher = cipher(associated, salt)?;
    let nonce = nonce_from(nonce)?;
    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &ciphertext,
                aad: associated.as_bytes(),
            },
        )
        .map_err(|_| ConfigError::crypto("failed to decrypt secret"))?;

    String::from_utf8(plaintext)
        .map_err(|e| ConfigError::crypto(format!("decrypted secret is not UTF-8: {e}")))
}

fn cipher(associated: &str, salt: &[u8]) -> ConfigResult<Aes256Gcm> {
    if salt.is_empty() {
        return Err(ConfigError::crypto("missing salt"));
    }
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(associated.as_bytes(), salt, KDF_ROUNDS, &mut key);
    Aes256Gcm::new_from_slice(&key).map_err(|e| ConfigError::crypto(format!("invalid key: {e}")))
}

fn nonce_from(nonce: &[u8]) -> ConfigResult<&Nonce<aes_gcm::aead::consts::U12>> {
    if nonce.len() != NONCE_LEN {
        return Err(ConfigError::crypto(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    Ok(Nonce::from_slice(nonce))
}

/// Serde adapter storing optional byte strings as base64
pub(crate) mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .filter(|s| !s.is_empty())
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (salt, nonce) = generate_salt_and_nonce();
        let encrypted = encrypt("key1", "s3cr3t", &salt, &nonce).unwrap();

        assert!(is_encrypted(&encrypted));
        assert!(!encrypted.contains("s3cr3t"));
        assert_eq!(decrypt("key1", &encrypted, &salt, &nonce).unwrap(), "s3cr3t");
    }

    #[test]
    fn test_decrypt_with_other_associated_string_fails() {
        let (salt, nonce) = generate_salt_and_nonce();
        let encrypted = encrypt("dev", "token", &salt, &nonce).unwrap();

        let err = decrypt("prod", &encrypted, &salt, &nonce).unwrap_err();
        assert!(matches!(err, ConfigError::Crypto(_)));
    }

    #[test]
    fn test_missing_salt_is_rejected() {
        let (_, nonce) = generate_salt_and_nonce();
        assert!(encrypt("key1", "secret", &[], &nonce).is_err());
    }

    #[test]
    fn test_short_nonce_is_rejected() {
        let (salt, _) = generate_salt_and_nonce();
        let err = encrypt("key1", "secret", &salt, &[0u8; 4]).unwrap_err();
        assert!(err.to_string().contains("nonce"));
    }

    #[test]
    fn test_fresh_nonces_differ() {
        let (salt, nonce) = generate_salt_and_nonce();
        let other = generate_nonce();
        assert_ne!(nonce, other);

        let a = encrypt("dev", "AAAAAAAAAAAAAAAA", &salt, &nonce).unwrap();
        let b = encrypt("dev", "AAAAAAAAAAAAAAAA", &salt, &other).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_salt_and_nonce_lengths() {
        let (salt, nonce) = generate_salt_and_nonce();
        assert_eq!(salt.len(), SALT_LEN);
        assert_eq!(nonce.len(), NONCE_LEN);
    }
}
