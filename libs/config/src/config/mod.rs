//! The root configuration aggregate.
//!
//! A [`Config`] is loaded once when the process starts, handed by reference
//! to every command that needs it, and written back with [`Config::save`]
//! whenever a command changes something that must outlive the process.
//!
//! This module holds the aggregate and its context/credential/platform
//! operations. Loading, validation, saving and the flag-overwrite protocol
//! live in the submodules.

mod load;
mod overwrite;
mod save;
mod validate;


use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::credential::{ApiKeyPair, Credential, LoginCredential};
use crate::error::{ConfigError, ConfigResult};
use crate::kafka::{KafkaClusterConfig, KafkaClusterContext};
use crate::platform::Platform;
use crate::schema_registry::SchemaRegistryCluster;
use crate::state::ContextState;

pub(crate) use overwrite::Overwrites;

/// Schema version written by this release
pub const CURRENT_VERSION: &str = "1.0.0";

/// Config file location relative to the home directory
pub const CONFIG_PATH: &str = ".tenantctl/config.json";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "TENANTCTL_CONFIG_FILE";

/// Environment variable supplying the organization when no context has one
pub const ORGANIZATION_ID_ENV: &str = "TENANTCTL_ORGANIZATION_ID";

/// Id of the placeholder cluster created by [`Config::create_context`]
pub const ANONYMOUS_CLUSTER_ID: &str = "anonymous-id";

/// The persisted configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub disable_update_check: bool,
    #[serde(default)]
    pub disable_updates: bool,
    #[serde(default)]
    pub disable_plugins: bool,
    #[serde(default)]
    pub disable_feature_flags: bool,
    #[serde(default)]
    pub enable_color: bool,
    #[serde(default)]
    pub platforms: HashMap<String, Platform>,
    #[serde(default)]
    pub credentials: HashMap<String, Credential>,
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: HashMap<String, Context>,
    /// Session state per context name, the on-disk form of `Context::state`
    #[serde(default)]
    pub context_states: HashMap<String, ContextState>,
    /// Remembered logins keyed by context name
    #[serde(default)]
    pub saved_credentials: HashMap<String, LoginCredential>,
    #[serde(default)]
    pub anonymous_id: String,

    /// Path the config was loaded from and is saved to
    #[serde(skip)]
    pub filename: PathBuf,
    /// Relaxes the state consistency check in [`Config::validate`]
    #[serde(skip)]
    pub is_test: bool,
    #[serde(skip)]
    pub(crate) overwrites: Overwrites,
}

/// Everything needed to register a new context
#[derive(Clone, Debug, Default)]
pub struct NewContext {
    pub name: String,
    pub platform_name: String,
    pub credential_name: String,
    pub kafka_cluster_context: Option<KafkaClusterContext>,
    pub schema_registry_clusters: HashMap<String, SchemaRegistryCluster>,
    pub state: Option<ContextState>,
    pub current_environment: String,
}

impl NewContext {
    pub fn new(
        name: impl Into<String>,
        platform_name: impl Into<String>,
        credential_name: impl Into<String>,
    ) -> Self {
        NewContext {
            name: name.into(),
            platform_name: platform_name.into(),
            credential_name: credential_name.into(),
            ..NewContext::default()
        }
    }
}

impl Config {
    /// An empty config that will be saved to `filename`
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Config {
            version: CURRENT_VERSION.to_string(),
            disable_update_check: false,
            disable_updates: false,
            disable_plugins: false,
            disable_feature_flags: false,
            enable_color: true,
            platforms: HashMap::new(),
            credentials: HashMap::new(),
            current_context: String::new(),
            contexts: HashMap::new(),
            context_states: HashMap::new(),
            saved_credentials: HashMap::new(),
            anonymous_id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            is_test: false,
            overwrites: Overwrites::default(),
        }
    }

    /// Resolve the config file path: explicit path, then the
    /// `TENANTCTL_CONFIG_FILE` variable, then the home directory default.
    pub fn config_path<P: AsRef<Path>>(path: Option<P>) -> PathBuf {
        if let Some(path) = path {
            return path.as_ref().to_path_buf();
        }
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }
        dirs::home_dir().unwrap_or_default().join(CONFIG_PATH)
    }

    // =========================================================================
    // Context resolution
    // =========================================================================

    /// The current context, `None` if none is selected or the name dangles
    pub fn context(&self) -> Option<&Context> {
        if self.current_context.is_empty() {
            return None;
        }
        self.contexts.get(&self.current_context)
    }

    pub fn context_mut(&mut self) -> Option<&mut Context> {
        if self.current_context.is_empty() {
            return None;
        }
        self.contexts.get_mut(&self.current_context)
    }

    pub fn find_context(&self, name: &str) -> ConfigResult<&Context> {
        self.contexts
            .get(name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))
    }

    pub fn find_context_mut(&mut self, name: &str) -> ConfigResult<&mut Context> {
        self.contexts
            .get_mut(name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))
    }

    /// Context names in sorted order
    pub fn context_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.contexts.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_cloud_login(&self) -> bool {
        self.context().is_some_and(|ctx| ctx.is_cloud() && ctx.has_login())
    }

    pub fn is_on_prem_login(&self) -> bool {
        self.context().is_some_and(|ctx| !ctx.is_cloud() && ctx.has_login())
    }

    /// Organization of the current session, then the one remembered by the
    /// current context, then `TENANTCTL_ORGANIZATION_ID`.
    pub fn last_used_org_id(&self) -> Option<String> {
        self.last_used_org_id_or(std::env::var(ORGANIZATION_ID_ENV).ok())
    }

    fn last_used_org_id_or(&self, fallback: Option<String>) -> Option<String> {
        if let Some(ctx) = self.context() {
            if let Some(org) = ctx.organization()
                && !org.resource_id.is_empty()
            {
                return Some(org.resource_id.clone());
            }
            if !ctx.last_org_id.is_empty() {
                return Some(ctx.last_org_id.clone());
            }
        }
        fallback.filter(|id| !id.is_empty())
    }

    pub fn reset_anonymous_id(&mut self) {
        self.anonymous_id = uuid::Uuid::new_v4().to_string();
    }

    // =========================================================================
    // Context lifecycle
    // =========================================================================

    /// Register a new context. The platform and credential must already be
    /// saved. Becomes the current context if none is selected.
    pub fn add_context(&mut self, new: NewContext) -> ConfigResult<()> {
        if new.name.is_empty() {
            return Err(ConfigError::InvalidArgument("context name must not be empty".into()));
        }
        if self.contexts.contains_key(&new.name) {
            return Err(ConfigError::already_exists("context", new.name));
        }
        let credential = self
            .credentials
            .get(&new.credential_name)
            .cloned()
            .ok_or_else(|| ConfigError::CredentialNotFound(new.credential_name.clone()))?;
        let platform = self
            .platforms
            .get(&new.platform_name)
            .cloned()
            .ok_or_else(|| ConfigError::PlatformNotFound(new.platform_name.clone()))?;

        let kafka_cluster_context = new
            .kafka_cluster_context
            .unwrap_or_else(|| KafkaClusterContext::new(false));
        kafka_cluster_context
            .validate()
            .map_err(|reason| ConfigError::corrupted(&new.name, &self.filename, reason))?;

        let mut context = Context::new(&new.name, platform, credential, kafka_cluster_context);
        context.schema_registry_clusters = new.schema_registry_clusters;
        context.current_environment = new.current_environment;
        let state = new.state.unwrap_or_default();
        context.state = Some(state.clone());

        self.context_states.insert(new.name.clone(), state);
        self.contexts.insert(new.name.clone(), context);
        if self.current_context.is_empty() {
            self.current_context = new.name.clone();
        }
        tracing::debug!(context = %new.name, "added context");
        Ok(())
    }

    /// Create an API-key context for a Kafka bootstrap URL: saves the
    /// platform and credential, seeds a placeholder cluster holding the key,
    /// and adds the context.
    pub fn create_context(
        &mut self,
        name: &str,
        bootstrap_url: &str,
        api_key: &str,
        api_secret: &str,
    ) -> ConfigResult<()> {
        if api_key.is_empty() {
            return Err(ConfigError::InvalidArgument("API key must not be empty".into()));
        }
        if self.contexts.contains_key(name) {
            return Err(ConfigError::already_exists("context", name));
        }
        let pair = ApiKeyPair::new(api_key, api_secret);

        let mut cluster = KafkaClusterConfig::new(ANONYMOUS_CLUSTER_ID, "anonymous-cluster", bootstrap_url);
        cluster.add_api_key(pair.clone());
        cluster.set_active_api_key(api_key)?;
        let kafka_cluster_context =
            KafkaClusterContext::with_clusters(HashMap::from([(cluster.id.clone(), cluster)]), ANONYMOUS_CLUSTER_ID);

        let platform = Platform::new(bootstrap_url);
        let credential = Credential::api_key(pair);
        let new = NewContext {
            kafka_cluster_context: Some(kafka_cluster_context),
            ..NewContext::new(name, &platform.name, &credential.name)
        };

        self.save_platform(platform)?;
        self.save_credential(credential)?;
        self.add_context(new)
    }

    /// Remove a context and its state; clears the current context if it
    /// pointed there.
    pub fn delete_context(&mut self, name: &str) -> ConfigResult<()> {
        if self.contexts.remove(name).is_none() {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        self.context_states.remove(name);
        self.saved_credentials.remove(name);
        if self.current_context == name {
            self.current_context.clear();
        }
        self.retarget_overwritten_context(name, None);
        tracing::debug!(context = %name, "deleted context");
        Ok(())
    }

    /// Make `name` the current context. While a `--context` overwrite is
    /// applied only the persisted selection changes.
    pub fn use_context(&mut self, name: &str) -> ConfigResult<()> {
        if !self.contexts.contains_key(name) {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        if !self.select_under_overwrite(name) {
            self.current_context = name.to_string();
        }
        Ok(())
    }

    /// Rename a context, carrying its state, saved login and current selection
    pub fn rename_context(&mut self, old: &str, new: &str) -> ConfigResult<()> {
        if new.is_empty() {
            return Err(ConfigError::InvalidArgument("context name must not be empty".into()));
        }
        if self.contexts.contains_key(new) {
            return Err(ConfigError::already_exists("context", new));
        }
        let mut context = self
            .contexts
            .remove(old)
            .ok_or_else(|| ConfigError::ContextNotFound(old.to_string()))?;

        // Tokens are bound to the context name; they are plaintext in memory
        // and get re-encrypted under the new name on save.
        if let Some(state) = context.state.as_mut() {
            state.reset_encryption();
        }
        context.name = new.to_string();
        if let Some(state) = context.state.clone() {
            self.context_states.insert(new.to_string(), state);
        }
        self.context_states.remove(old);
        if let Some(login) = self.saved_credentials.remove(old) {
            self.saved_credentials.insert(new.to_string(), login);
        }
        self.contexts.insert(new.to_string(), context);
        if self.current_context == old {
            self.current_context = new.to_string();
        }
        self.retarget_overwritten_context(old, Some(new));
        Ok(())
    }

    // =========================================================================
    // Credentials and platforms
    // =========================================================================

    /// Add or replace a credential. Replacing keeps the type; contexts using
    /// it are re-linked.
    pub fn save_credential(&mut self, credential: Credential) -> ConfigResult<()> {
        if credential.name.is_empty() {
            return Err(ConfigError::InvalidArgument("credential must have a name".into()));
        }
        if let Some(existing) = self.credentials.get(&credential.name)
            && existing.credential_type != credential.credential_type
        {
            return Err(ConfigError::CredentialTypeChange {
                name: credential.name.clone(),
                existing: existing.credential_type.to_string(),
                requested: credential.credential_type.to_string(),
            });
        }
        for context in self.contexts.values_mut() {
            if context.credential_name == credential.name {
                context.credential = Some(credential.clone());
            }
        }
        self.credentials.insert(credential.name.clone(), credential);
        Ok(())
    }

    /// Add or replace a platform. An unnamed platform is named after its server.
    pub fn save_platform(&mut self, mut platform: Platform) -> ConfigResult<()> {
        if platform.server.is_empty() {
            return Err(ConfigError::InvalidArgument("platform must have a server".into()));
        }
        if platform.name.is_empty() {
            platform.name = crate::platform::platform_name(&platform.server);
        }
        for context in self.contexts.values_mut() {
            if context.platform_name == platform.name {
                context.platform = Some(platform.clone());
            }
        }
        self.platforms.insert(platform.name.clone(), platform);
        Ok(())
    }

    /// Remember a login for a context
    pub fn save_login_credential(&mut self, context_name: &str, login: LoginCredential) -> ConfigResult<()> {
        if !self.contexts.contains_key(context_name) {
            return Err(ConfigError::ContextNotFound(context_name.to_string()));
        }
        self.saved_credentials.insert(context_name.to_string(), login);
        Ok(())
    }

    pub fn login_credential(&self, context_name: &str) -> Option<&LoginCredential> {
        self.saved_credentials.get(context_name)
    }

    pub fn remove_login_credential(&mut self, context_name: &str) -> bool {
        self.saved_credentials.remove(context_name).is_some()
    }

    /// Copy every context's live state into `context_states`
    pub(crate) fn sync_context_states(&mut self) {
        for (name, context) in &self.contexts {
            if let Some(state) = &context.state {
                self.context_states.insert(name.clone(), state.clone());
            }
        }
    }
}
