//! Cached, sensitive session state of a context.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::secret::{self, base64_bytes};

/// Authenticated user
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
}

/// Organization the user authenticated into
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Organization {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub name: String,
}

/// An environment (account) visible to the user
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Account {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Identity returned by a login
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    /// Default environment picked at login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Account>,
}

/// Session state cached for a context.
///
/// Tokens are plaintext in memory and encrypted, bound to the context name,
/// while the config is written. Both tokens share the salt; each has its own
/// nonce, drawn fresh every time the token is encrypted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ContextState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_refresh_token: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub salt: Option<Vec<u8>>,
    /// Nonce of `auth_token`
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Vec<u8>>,
    /// Nonce of `auth_refresh_token`. Files without one used `nonce` for both.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub refresh_nonce: Option<Vec<u8>>,
}

/// Plaintext tokens captured before encryption, restored after a save
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Tokens {
    pub auth_token: String,
    pub auth_refresh_token: String,
}

impl ContextState {
    pub fn is_empty(&self) -> bool {
        self.auth.is_none() && !self.has_tokens()
    }

    pub fn has_tokens(&self) -> bool {
        !self.auth_token.is_empty() || !self.auth_refresh_token.is_empty()
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.auth.as_ref()?.organization.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.auth.as_ref()?.user.as_ref()
    }

    /// Encrypt both tokens in place; returns the plaintext tokens.
    /// Already encrypted tokens are left as they are.
    pub(crate) fn encrypt_tokens(&mut self, context_name: &str) -> ConfigResult<Tokens> {
        let plaintext = Tokens {
            auth_token: self.auth_token.clone(),
            auth_refresh_token: self.auth_refresh_token.clone(),
        };
        let salt = self
            .salt
            .get_or_insert_with(secret::generate_salt)
            .clone();
        encrypt_token(context_name, &mut self.auth_token, &salt, &mut self.nonce)?;
        encrypt_token(
            context_name,
            &mut self.auth_refresh_token,
            &salt,
            &mut self.refresh_nonce,
        )?;
        Ok(plaintext)
    }

    /// Decrypt both tokens in place. Plaintext tokens pass through.
    pub(crate) fn decrypt_tokens(&mut self, context_name: &str) -> ConfigResult<()> {
        if !secret::is_encrypted(&self.auth_token) && !secret::is_encrypted(&self.auth_refresh_token) {
            return Ok(());
        }
        let salt = self
            .salt
            .as_deref()
            .ok_or_else(|| ConfigError::crypto("context state has encrypted tokens but no salt"))?;
        let refresh_nonce = self.refresh_nonce.as_deref().or(self.nonce.as_deref());
        let auth_token = decrypt_token(context_name, &self.auth_token, salt, self.nonce.as_deref())?;
        let auth_refresh_token =
            decrypt_token(context_name, &self.auth_refresh_token, salt, refresh_nonce)?;
        self.auth_token = auth_token;
        self.auth_refresh_token = auth_refresh_token;
        Ok(())
    }

    pub(crate) fn restore_tokens(&mut self, tokens: Tokens) {
        self.auth_token = tokens.auth_token;
        self.auth_refresh_token = tokens.auth_refresh_token;
    }

    /// Drop the salt and nonces, forcing fresh ones on the next save
    pub(crate) fn reset_encryption(&mut self) {
        self.salt = None;
        self.nonce = None;
        self.refresh_nonce = None;
    }
}

/// Encrypt a plaintext token under a fresh nonce, stored in `nonce`
fn encrypt_token(
    context_name: &str,
    token: &mut String,
    salt: &[u8],
    nonce: &mut Option<Vec<u8>>,
) -> ConfigResult<()> {
    if token.is_empty() || secret::is_encrypted(token) {
        return Ok(());
    }
    let fresh = secret::generate_nonce();
    *token = secret::encrypt(context_name, token, salt, &fresh)?;
    *nonce = Some(fresh);
    Ok(())
}

fn decrypt_token(context_name: &str, token: &str, salt: &[u8], nonce: Option<&[u8]>) -> ConfigResult<String> {
    if !secret::is_encrypted(token) {
        return Ok(token.to_string());
    }
    let nonce = nonce.ok_or_else(|| ConfigError::crypto("encrypted token has no nonce"))?;
    secret::decrypt(context_name, token, salt, nonce)
}
