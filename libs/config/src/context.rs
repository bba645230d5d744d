//! Named contexts: a platform, a credential and the session bound to them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::credential::{Credential, CredentialType};
use crate::environment::EnvironmentContext;
use crate::error::ConfigResult;
use crate::kafka::{KafkaClusterConfig, KafkaClusterContext};
use crate::platform::Platform;
use crate::schema_registry::SchemaRegistryCluster;
use crate::state::{AuthConfig, ContextState, Organization, User};

/// A named, switchable login profile.
///
/// `platform` and `credential` are linked copies of the entries named by
/// `platform_name` / `credential_name`; they are not written to disk and are
/// re-linked whenever the config is loaded or the entries are replaced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Context {
    pub name: String,
    #[serde(rename = "platform")]
    pub platform_name: String,
    #[serde(rename = "credential")]
    pub credential_name: String,
    /// Selected environment id; scopes environment-level selections
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_environment: String,
    pub kafka_cluster_context: KafkaClusterContext,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environments: HashMap<String, EnvironmentContext>,
    /// Schema Registry clusters keyed by environment id
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub schema_registry_clusters: HashMap<String, SchemaRegistryCluster>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub netrc_machine_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_org_id: String,

    #[serde(skip)]
    pub state: Option<ContextState>,
    #[serde(skip)]
    pub(crate) platform: Option<Platform>,
    #[serde(skip)]
    pub(crate) credential: Option<Credential>,
}

impl Context {
    pub(crate) fn new(
        name: impl Into<String>,
        platform: Platform,
        credential: Credential,
        kafka_cluster_context: KafkaClusterContext,
    ) -> Self {
        Context {
            name: name.into(),
            platform_name: platform.name.clone(),
            credential_name: credential.name.clone(),
            current_environment: String::new(),
            kafka_cluster_context,
            environments: HashMap::new(),
            schema_registry_clusters: HashMap::new(),
            netrc_machine_name: String::new(),
            last_org_id: String::new(),
            state: Some(ContextState::default()),
            platform: Some(platform),
            credential: Some(credential),
        }
    }

    pub fn platform(&self) -> Option<&Platform> {
        self.platform.as_ref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn platform_server(&self) -> Option<&str> {
        self.platform.as_ref().map(|p| p.server.as_str())
    }

    /// Whether the context targets the multi-tenant cloud service
    pub fn is_cloud(&self) -> bool {
        self.platform.as_ref().is_some_and(Platform::is_cloud)
    }

    // -------------------------------------------------------------------------
    // Session state
    // -------------------------------------------------------------------------

    pub fn state(&self) -> Option<&ContextState> {
        self.state.as_ref()
    }

    /// Mutable state, creating an empty one if the context has none
    pub fn state_mut(&mut self) -> &mut ContextState {
        self.state.get_or_insert_with(ContextState::default)
    }

    pub fn auth_token(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.auth_token.as_str())
    }

    pub fn auth_refresh_token(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.auth_refresh_token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.state.as_ref()?.user()
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.state.as_ref()?.organization()
    }

    /// Store the tokens returned by a login or refresh
    pub fn update_auth_tokens(&mut self, auth_token: impl Into<String>, auth_refresh_token: impl Into<String>) {
        let state = self.state_mut();
        state.auth_token = auth_token.into();
        state.auth_refresh_token = auth_refresh_token.into();
    }

    /// Record the identity of a login; remembers the organization for later logins
    pub fn set_auth(&mut self, auth: AuthConfig) {
        if let Some(org) = auth.organization.as_ref()
            && !org.resource_id.is_empty()
        {
            self.last_org_id = org.resource_id.clone();
        }
        self.state_mut().auth = Some(auth);
    }

    /// Forget the session (logout); keeps the salt so the next save reuses it
    pub fn delete_user_auth(&mut self) {
        let state = self.state_mut();
        state.auth = None;
        state.auth_token.clear();
        state.auth_refresh_token.clear();
    }

    pub fn has_login(&self) -> bool {
        !self.auth_token().is_empty() && self.credential.is_some()
    }

    /// Logged in with a username/password credential
    pub fn has_basic_login(&self) -> bool {
        self.has_login()
            && self
                .credential
                .as_ref()
                .is_some_and(|c| c.credential_type == CredentialType::Username)
    }

    // -------------------------------------------------------------------------
    // Environment selections
    // -------------------------------------------------------------------------

    /// Selected environment, falling back to the default picked at login
    pub fn current_environment(&self) -> Option<&str> {
        if !self.current_environment.is_empty() {
            return Some(self.current_environment.as_str());
        }
        self.state
            .as_ref()?
            .auth
            .as_ref()?
            .account
            .as_ref()
            .map(|account| account.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn set_current_environment(&mut self, environment_id: impl Into<String>) {
        self.current_environment = environment_id.into();
    }

    fn environment_key(&self) -> String {
        self.current_environment().unwrap_or_default().to_string()
    }

    pub fn current_flink_compute_pool(&self) -> Option<&str> {
        self.environments
            .get(self.current_environment()?)
            .map(|env| env.current_flink_compute_pool.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn set_current_flink_compute_pool(&mut self, pool_id: impl Into<String>) {
        let key = self.environment_key();
        self.environments.entry(key).or_default().current_flink_compute_pool = pool_id.into();
    }

    pub fn current_identity_pool(&self) -> Option<&str> {
        self.environments
            .get(self.current_environment()?)
            .map(|env| env.current_identity_pool.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn set_current_identity_pool(&mut self, pool_id: impl Into<String>) {
        let key = self.environment_key();
        self.environments.entry(key).or_default().current_identity_pool = pool_id.into();
    }

    pub fn schema_registry_cluster(&self) -> Option<&SchemaRegistryCluster> {
        self.schema_registry_clusters.get(self.current_environment()?)
    }

    pub fn set_schema_registry_cluster(&mut self, cluster: SchemaRegistryCluster) {
        let key = self.environment_key();
        self.schema_registry_clusters.insert(key, cluster);
    }

    // -------------------------------------------------------------------------
    // Kafka clusters (scoped by the current environment)
    // -------------------------------------------------------------------------

    pub fn active_kafka_cluster_id(&self) -> Option<&str> {
        let env = self.current_environment().unwrap_or_default();
        self.kafka_cluster_context.active_kafka_cluster_id(env)
    }

    pub fn set_active_kafka_cluster(&mut self, cluster_id: &str) -> ConfigResult<()> {
        let env = self.environment_key();
        self.kafka_cluster_context.set_active_kafka_cluster(&env, cluster_id)
    }

    pub(crate) fn force_active_kafka_cluster(&mut self, cluster_id: &str) {
        let env = self.environment_key();
        self.kafka_cluster_context.force_active_kafka_cluster(&env, cluster_id);
    }

    pub fn active_kafka_cluster_config(&self) -> Option<&KafkaClusterConfig> {
        let env = self.current_environment().unwrap_or_default();
        self.kafka_cluster_context.active_kafka_cluster_config(env)
    }

    pub fn kafka_cluster_config(&self, cluster_id: &str) -> Option<&KafkaClusterConfig> {
        let env = self.current_environment().unwrap_or_default();
        self.kafka_cluster_context.kafka_cluster_config(env, cluster_id)
    }

    pub fn add_kafka_cluster_config(&mut self, config: KafkaClusterConfig) {
        let env = self.environment_key();
        self.kafka_cluster_context.add_kafka_cluster_config(&env, config);
    }

    pub fn remove_kafka_cluster(&mut self, cluster_id: &str) -> bool {
        let env = self.environment_key();
        self.kafka_cluster_context.remove_kafka_cluster(&env, cluster_id)
    }

    pub fn delete_api_key(&mut self, key: &str) -> bool {
        let env = self.environment_key();
        self.kafka_cluster_context.delete_api_key(&env, key)
    }

    /// Encrypt every key pair owned by this context
    pub(crate) fn encrypt_api_keys(&mut self) -> ConfigResult<()> {
        self.kafka_cluster_context.encrypt_api_keys()?;
        self.schema_registry_clusters
            .values_mut()
            .try_for_each(SchemaRegistryCluster::encrypt_secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::ApiKeyPair;
    use crate::state::Account;

    fn context(environment_context: bool) -> Context {
        Context::new(
            "dev",
            Platform::new("https://api.tenantctl.cloud"),
            Credential::username("alice", ""),
            KafkaClusterContext::new(environment_context),
        )
    }

    #[test]
    fn test_environment_falls_back_to_login_account() {
        let mut ctx = context(false);
        assert_eq!(ctx.current_environment(), None);

        ctx.set_auth(AuthConfig {
            account: Some(Account::new("env-default", "default")),
            ..AuthConfig::default()
        });
        assert_eq!(ctx.current_environment(), Some("env-default"));

        ctx.set_current_environment("env-other");
        assert_eq!(ctx.current_environment(), Some("env-other"));
    }

    #[test]
    fn test_pools_are_scoped_by_environment() {
        let mut ctx = context(false);
        ctx.set_current_environment("env-a");
        ctx.set_current_flink_compute_pool("lfcp-a");
        ctx.set_current_identity_pool("pool-a");

        ctx.set_current_environment("env-b");
        assert_eq!(ctx.current_flink_compute_pool(), None);
        ctx.set_current_flink_compute_pool("lfcp-b");

        ctx.set_current_environment("env-a");
        assert_eq!(ctx.current_flink_compute_pool(), Some("lfcp-a"));
        assert_eq!(ctx.current_identity_pool(), Some("pool-a"));
    }

    #[test]
    fn test_env_scoped_kafka_follows_current_environment() {
        let mut ctx = context(true);
        ctx.set_current_environment("env-a");
        ctx.add_kafka_cluster_config(KafkaClusterConfig::new("lkc-a", "a", "a:9092"));
        ctx.set_active_kafka_cluster("lkc-a").unwrap();

        ctx.set_current_environment("env-b");
        assert_eq!(ctx.active_kafka_cluster_id(), None);

        ctx.set_current_environment("env-a");
        assert_eq!(ctx.active_kafka_cluster_id(), Some("lkc-a"));
        assert_eq!(ctx.active_kafka_cluster_config().map(|c| c.name.as_str()), Some("a"));
    }

    #[test]
    fn test_login_state_helpers() {
        let mut ctx = context(false);
        assert!(!ctx.has_login());

        ctx.update_auth_tokens("token", "refresh");
        assert!(ctx.has_login());
        assert!(ctx.has_basic_login());

        ctx.delete_user_auth();
        assert!(!ctx.has_login());
        assert_eq!(ctx.auth_refresh_token(), "");
    }

    #[test]
    fn test_set_auth_remembers_organization() {
        let mut ctx = context(false);
        ctx.set_auth(AuthConfig {
            organization: Some(Organization {
                id: "1".into(),
                resource_id: "org-123".into(),
                name: "acme".into(),
            }),
            ..AuthConfig::default()
        });
        assert_eq!(ctx.last_org_id, "org-123");
        assert_eq!(ctx.organization().map(|o| o.name.as_str()), Some("acme"));
    }

    #[test]
    fn test_schema_registry_cluster_per_environment() {
        let mut ctx = context(false);
        ctx.set_current_environment("env-a");
        ctx.set_schema_registry_cluster(SchemaRegistryCluster {
            id: "lsrc-1".into(),
            schema_registry_endpoint: "https://psrc.example.com".into(),
            src_credentials: Some(ApiKeyPair::new("SR", "secret")),
        });
        assert_eq!(ctx.schema_registry_cluster().map(|c| c.id.as_str()), Some("lsrc-1"));

        ctx.set_current_environment("env-b");
        assert!(ctx.schema_registry_cluster().is_none());
    }

    #[test]
    fn test_is_cloud_uses_platform() {
        assert!(context(false).is_cloud());
    }
}
