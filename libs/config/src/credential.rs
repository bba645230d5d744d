//! Credentials and API key pairs.
//!
//! A [`Credential`] is an authentication mechanism that exists independently
//! of any context; contexts reference it by name. Key pair secrets are
//! encrypted in place when the config is written and stay that way; read them
//! through [`ApiKeyPair::decrypted`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, ConfigResult};
use crate::secret::{self, base64_bytes};

/// How a credential authenticates
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialType {
    Username,
    ApiKey,
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialType::Username => write!(f, "username"),
            CredentialType::ApiKey => write!(f, "api-key"),
        }
    }
}

/// An API key and its secret
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ApiKeyPair {
    pub key: String,
    pub secret: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub salt: Option<Vec<u8>>,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Vec<u8>>,
}

impl ApiKeyPair {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        ApiKeyPair {
            key: key.into(),
            secret: secret.into(),
            salt: None,
            nonce: None,
        }
    }

    /// Encrypt the secret in place.
    ///
    /// A secret that already carries the encryption marker is left untouched.
    /// The salt is generated on first use and kept; every encryption draws
    /// a fresh nonce.
    pub fn encrypt_secret(&mut self) -> ConfigResult<()> {
        if self.secret.is_empty() || secret::is_encrypted(&self.secret) {
            return Ok(());
        }
        let salt = self.salt.get_or_insert_with(secret::generate_salt);
        let nonce = secret::generate_nonce();
        self.secret = secret::encrypt(&self.key, &self.secret, salt, &nonce)?;
        self.nonce = Some(nonce);
        Ok(())
    }

    /// Decrypt the secret in place.
    ///
    /// Only acts when the secret carries the encryption marker and a salt is
    /// available; anything else is treated as plaintext.
    pub fn decrypt_secret(&mut self) -> ConfigResult<()> {
        if !secret::is_encrypted(&self.secret) {
            return Ok(());
        }
        if self.salt.is_none() {
            tracing::warn!(key = %self.key, "encrypted API secret has no salt, leaving it encrypted");
            return Ok(());
        }
        let (salt, nonce) = self.salt_and_nonce()?;
        self.secret = secret::decrypt(&self.key, &self.secret, salt, nonce)?;
        Ok(())
    }

    /// A copy of this pair with the secret decrypted
    pub fn decrypted(&self) -> ConfigResult<ApiKeyPair> {
        let mut pair = self.clone();
        pair.decrypt_secret()?;
        Ok(pair)
    }

    fn salt_and_nonce(&self) -> ConfigResult<(&[u8], &[u8])> {
        match (&self.salt, &self.nonce) {
            (Some(salt), Some(nonce)) => Ok((salt, nonce)),
            _ => Err(ConfigError::crypto(format!(
                "API key \"{}\" is missing its salt or nonce",
                self.key
            ))),
        }
    }
}

/// An authentication mechanism that contexts reference by name
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Never written to disk; persisted logins live in `saved_credentials`
    #[serde(skip)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_pair: Option<ApiKeyPair>,
    pub credential_type: CredentialType,
}

impl Credential {
    /// Username/password credential named `username-<username>`
    pub fn username(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        Credential {
            name: format!("{}-{}", CredentialType::Username, username),
            username,
            password: password.into(),
            api_key_pair: None,
            credential_type: CredentialType::Username,
        }
    }

    /// API key credential named `api-key-<key>`
    pub fn api_key(pair: ApiKeyPair) -> Self {
        Credential {
            name: format!("{}-{}", CredentialType::ApiKey, pair.key),
            username: String::new(),
            password: String::new(),
            api_key_pair: Some(pair),
            credential_type: CredentialType::ApiKey,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check the payload matches the declared type
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("has a credential without a name".into());
        }
        match self.credential_type {
            CredentialType::Username if self.username.is_empty() => Err(format!(
                "references username credential \"{}\" without a username",
                self.name
            )),
            CredentialType::ApiKey if self.api_key_pair.is_none() => Err(format!(
                "references API key credential \"{}\" without a key pair",
                self.name
            )),
            _ => Ok(()),
        }
    }

    pub fn encrypt_secrets(&mut self) -> ConfigResult<()> {
        match self.api_key_pair.as_mut() {
            Some(pair) => pair.encrypt_secret(),
            None => Ok(()),
        }
    }

    pub fn decrypt_secrets(&mut self) -> ConfigResult<()> {
        match self.api_key_pair.as_mut() {
            Some(pair) => pair.decrypt_secret(),
            None => Ok(()),
        }
    }
}

/// A remembered username/password login, with the password encrypted at rest
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LoginCredential {
    pub username: String,
    pub encrypted_password: String,
    #[serde(default)]
    pub is_cloud: bool,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub salt: Option<Vec<u8>>,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Vec<u8>>,
}

impl LoginCredential {
    /// Encrypt `password` bound to `username`
    pub fn new(username: impl Into<String>, password: &str, is_cloud: bool) -> ConfigResult<Self> {
        let username = username.into();
        let (salt, nonce) = secret::generate_salt_and_nonce();
        let encrypted_password = secret::encrypt(&username, password, &salt, &nonce)?;
        Ok(LoginCredential {
            username,
            encrypted_password,
            is_cloud,
            salt: Some(salt),
            nonce: Some(nonce),
        })
    }

    /// Decrypt the stored password
    pub fn password(&self) -> ConfigResult<String> {
        match (&self.salt, &self.nonce) {
            (Some(salt), Some(nonce)) => {
                secret::decrypt(&self.username, &self.encrypted_password, salt, nonce)
            }
            _ => Err(ConfigError::crypto(format!(
                "saved login for \"{}\" is missing its salt or nonce",
                self.username
            ))),
        }
    }
}
