//! Known Kafka clusters and the active-cluster selection of a context.
//!
//! A [`KafkaClusterContext`] runs in one of two modes fixed at construction:
//! a single active cluster for the whole context, or one active cluster per
//! environment. Every operation takes the context's current environment and
//! ignores it in global mode.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::credential::ApiKeyPair;
use crate::error::{ConfigError, ConfigResult};

/// Cached metadata and credentials of a Kafka cluster
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct KafkaClusterConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "bootstrap_servers")]
    pub bootstrap: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_endpoint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rest_endpoint: String,
    /// Known key pairs, keyed by API key
    #[serde(default)]
    pub api_keys: HashMap<String, ApiKeyPair>,
    /// Active API key; empty when none is selected
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
}

impl KafkaClusterConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bootstrap: impl Into<String>) -> Self {
        KafkaClusterConfig {
            id: id.into(),
            name: name.into(),
            bootstrap: bootstrap.into(),
            ..KafkaClusterConfig::default()
        }
    }

    /// Store a key pair, replacing any pair with the same key
    pub fn add_api_key(&mut self, pair: ApiKeyPair) {
        self.api_keys.insert(pair.key.clone(), pair);
    }

    /// Select the active API key; it must already be stored
    pub fn set_active_api_key(&mut self, key: &str) -> ConfigResult<()> {
        if !key.is_empty() && !self.api_keys.contains_key(key) {
            return Err(ConfigError::ApiKeyNotFound(key.to_string()));
        }
        self.api_key = key.to_string();
        Ok(())
    }

    pub fn active_api_key_pair(&self) -> Option<&ApiKeyPair> {
        if self.api_key.is_empty() {
            return None;
        }
        self.api_keys.get(&self.api_key)
    }

    /// Remove a key pair; clears the active key if it was the one removed
    pub fn delete_api_key(&mut self, key: &str) -> bool {
        let removed = self.api_keys.remove(key).is_some();
        if self.api_key == key {
            self.api_key.clear();
        }
        removed
    }

    pub fn encrypt_api_keys(&mut self) -> ConfigResult<()> {
        self.api_keys.values_mut().try_for_each(ApiKeyPair::encrypt_secret)
    }

    pub fn decrypt_api_keys(&mut self) -> ConfigResult<()> {
        self.api_keys.values_mut().try_for_each(ApiKeyPair::decrypt_secret)
    }

    fn validate(&self) -> Result<(), String> {
        for (key, pair) in &self.api_keys {
            if pair.key != *key {
                return Err(format!(
                    "stores API key \"{}\" under mismatched key \"{key}\" in cluster \"{}\"",
                    pair.key, self.id
                ));
            }
        }
        if !self.api_key.is_empty() && !self.api_keys.contains_key(&self.api_key) {
            return Err(format!(
                "selects API key \"{}\" which is not stored for cluster \"{}\"",
                self.api_key, self.id
            ));
        }
        Ok(())
    }
}

/// Active cluster and known clusters of one scope (global or one environment)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct KafkaEnvContext {
    #[serde(default)]
    pub active_kafka: String,
    #[serde(default)]
    pub kafka_cluster_configs: HashMap<String, KafkaClusterConfig>,
}

impl KafkaEnvContext {
    fn validate(&self) -> Result<(), String> {
        for (id, cluster) in &self.kafka_cluster_configs {
            if cluster.id != *id {
                return Err(format!(
                    "stores Kafka cluster \"{}\" under mismatched id \"{id}\"",
                    cluster.id
                ));
            }
            cluster.validate()?;
        }
        if !self.active_kafka.is_empty() && !self.kafka_cluster_configs.contains_key(&self.active_kafka) {
            return Err(format!(
                "selects Kafka cluster \"{}\" which is not among its known clusters",
                self.active_kafka
            ));
        }
        Ok(())
    }
}

/// Tracks the active Kafka cluster of a context
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct KafkaClusterContext {
    /// Whether the active cluster is tracked per environment
    #[serde(default)]
    pub environment_context: bool,
    #[serde(flatten)]
    global: KafkaEnvContext,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    kafka_environment_contexts: HashMap<String, KafkaEnvContext>,
}

impl KafkaClusterContext {
    pub fn new(environment_context: bool) -> Self {
        KafkaClusterContext {
            environment_context,
            ..KafkaClusterContext::default()
        }
    }

    /// Global-mode context seeded with clusters and an active id
    pub fn with_clusters(
        kafka_cluster_configs: HashMap<String, KafkaClusterConfig>,
        active_kafka: impl Into<String>,
    ) -> Self {
        KafkaClusterContext {
            environment_context: false,
            global: KafkaEnvContext {
                active_kafka: active_kafka.into(),
                kafka_cluster_configs,
            },
            kafka_environment_contexts: HashMap::new(),
        }
    }

    fn scope(&self, environment: &str) -> Option<&KafkaEnvContext> {
        if self.environment_context {
            self.kafka_environment_contexts.get(environment)
        } else {
            Some(&self.global)
        }
    }

    fn scope_mut(&mut self, environment: &str) -> &mut KafkaEnvContext {
        if self.environment_context {
            self.kafka_environment_contexts
                .entry(environment.to_string())
                .or_default()
        } else {
            &mut self.global
        }
    }

    /// Write the active id of a scope. Clearing the id of a scope that does
    /// not exist yet leaves the scope map alone.
    fn write_active_kafka(&mut self, environment: &str, cluster_id: &str) {
        if cluster_id.is_empty() && self.scope(environment).is_none() {
            return;
        }
        self.scope_mut(environment).active_kafka = cluster_id.to_string();
    }

    fn scopes_mut(&mut self) -> impl Iterator<Item = &mut KafkaEnvContext> {
        std::iter::once(&mut self.global).chain(self.kafka_environment_contexts.values_mut())
    }

    /// Active cluster id, `None` when no cluster is selected
    pub fn active_kafka_cluster_id(&self, environment: &str) -> Option<&str> {
        self.scope(environment)
            .map(|scope| scope.active_kafka.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Select the active cluster. An empty id clears the selection; any other
    /// id must be a known cluster, otherwise nothing changes.
    pub fn set_active_kafka_cluster(&mut self, environment: &str, cluster_id: &str) -> ConfigResult<()> {
        let known = self
            .scope(environment)
            .is_some_and(|scope| scope.kafka_cluster_configs.contains_key(cluster_id));
        if !cluster_id.is_empty() && !known {
            return Err(ConfigError::KafkaClusterNotFound(cluster_id.to_string()));
        }
        self.write_active_kafka(environment, cluster_id);
        Ok(())
    }

    /// Set the active id without checking the known clusters. Used by the
    /// flag-overwrite path, which may point at a cluster not cached yet.
    pub(crate) fn force_active_kafka_cluster(&mut self, environment: &str, cluster_id: &str) {
        self.write_active_kafka(environment, cluster_id);
    }

    pub fn active_kafka_cluster_config(&self, environment: &str) -> Option<&KafkaClusterConfig> {
        let scope = self.scope(environment)?;
        scope.kafka_cluster_configs.get(&scope.active_kafka)
    }

    pub fn active_kafka_cluster_config_mut(&mut self, environment: &str) -> Option<&mut KafkaClusterConfig> {
        let scope = self.scope_mut(environment);
        scope.kafka_cluster_configs.get_mut(&scope.active_kafka)
    }

    pub fn kafka_cluster_config(&self, environment: &str, cluster_id: &str) -> Option<&KafkaClusterConfig> {
        self.scope(environment)?.kafka_cluster_configs.get(cluster_id)
    }

    pub fn kafka_cluster_config_mut(
        &mut self,
        environment: &str,
        cluster_id: &str,
    ) -> Option<&mut KafkaClusterConfig> {
        self.scope_mut(environment).kafka_cluster_configs.get_mut(cluster_id)
    }

    /// Known clusters of the scope, keyed by id
    pub fn kafka_cluster_configs(&self, environment: &str) -> Option<&HashMap<String, KafkaClusterConfig>> {
        self.scope(environment).map(|scope| &scope.kafka_cluster_configs)
    }

    /// Add or replace a known cluster
    pub fn add_kafka_cluster_config(&mut self, environment: &str, config: KafkaClusterConfig) {
        self.scope_mut(environment)
            .kafka_cluster_configs
            .insert(config.id.clone(), config);
    }

    /// Forget a cluster; clears the active id if it was the one removed
    pub fn remove_kafka_cluster(&mut self, environment: &str, cluster_id: &str) -> bool {
        let scope = self.scope_mut(environment);
        let removed = scope.kafka_cluster_configs.remove(cluster_id).is_some();
        if scope.active_kafka == cluster_id {
            scope.active_kafka.clear();
        }
        removed
    }

    /// Remove an API key from every cluster of the scope
    pub fn delete_api_key(&mut self, environment: &str, key: &str) -> bool {
        self.scope_mut(environment)
            .kafka_cluster_configs
            .values_mut()
            .fold(false, |removed, cluster| cluster.delete_api_key(key) || removed)
    }

    pub fn encrypt_api_keys(&mut self) -> ConfigResult<()> {
        for scope in self.scopes_mut() {
            for cluster in scope.kafka_cluster_configs.values_mut() {
                cluster.encrypt_api_keys()?;
            }
        }
        Ok(())
    }

    pub fn decrypt_api_keys(&mut self) -> ConfigResult<()> {
        for scope in self.scopes_mut() {
            for cluster in scope.kafka_cluster_configs.values_mut() {
                cluster.decrypt_api_keys()?;
            }
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        self.global.validate()?;
        self.kafka_environment_contexts
            .values()
            .try_for_each(KafkaEnvContext::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(id: &str) -> KafkaClusterConfig {
        KafkaClusterConfig::new(id, format!("{id}-name"), format!("SASL_SSL://{id}:9092"))
    }

    fn global_with(ids: &[&str]) -> KafkaClusterContext {
        let mut ctx = KafkaClusterContext::new(false);
        for id in ids {
            ctx.add_kafka_cluster_config("", cluster(id));
        }
        ctx
    }

    #[test]
    fn test_set_active_requires_known_cluster() {
        let mut ctx = global_with(&["lkc-1"]);
        ctx.set_active_kafka_cluster("", "lkc-1").unwrap();

        let err = ctx.set_active_kafka_cluster("", "lkc-missing").unwrap_err();
        assert!(matches!(err, ConfigError::KafkaClusterNotFound(id) if id == "lkc-missing"));
        assert_eq!(ctx.active_kafka_cluster_id(""), Some("lkc-1"));
    }

    #[test]
    fn test_empty_id_clears_active_cluster() {
        let mut ctx = global_with(&["lkc-1"]);
        ctx.set_active_kafka_cluster("", "lkc-1").unwrap();
        ctx.set_active_kafka_cluster("", "").unwrap();
        assert_eq!(ctx.active_kafka_cluster_id(""), None);
        assert!(ctx.active_kafka_cluster_config("").is_none());
    }

    #[test]
    fn test_remove_active_cluster_unsets_it() {
        let mut ctx = global_with(&["lkc-1", "lkc-2"]);
        ctx.set_active_kafka_cluster("", "lkc-1").unwrap();

        assert!(ctx.remove_kafka_cluster("", "lkc-1"));
        assert_eq!(ctx.active_kafka_cluster_id(""), None);
        assert!(ctx.kafka_cluster_config("", "lkc-2").is_some());
    }

    #[test]
    fn test_environment_scoped_clusters_are_isolated() {
        let mut ctx = KafkaClusterContext::new(true);
        ctx.add_kafka_cluster_config("env-a", cluster("lkc-a"));
        ctx.add_kafka_cluster_config("env-b", cluster("lkc-b"));

        ctx.set_active_kafka_cluster("env-a", "lkc-a").unwrap();
        assert!(ctx.set_active_kafka_cluster("env-b", "lkc-a").is_err());

        assert_eq!(ctx.active_kafka_cluster_id("env-a"), Some("lkc-a"));
        assert_eq!(ctx.active_kafka_cluster_id("env-b"), None);
        assert_eq!(ctx.active_kafka_cluster_id("env-c"), None);
    }

    #[test]
    fn test_clearing_missing_scope_adds_no_environment() {
        let mut ctx = KafkaClusterContext::new(true);
        ctx.force_active_kafka_cluster("", "");
        ctx.set_active_kafka_cluster("env-a", "").unwrap();

        let value = serde_json::to_value(&ctx).unwrap();
        assert!(value.get("kafka_environment_contexts").is_none());

        ctx.force_active_kafka_cluster("env-a", "lkc-flag");
        ctx.force_active_kafka_cluster("env-a", "");
        assert_eq!(ctx.active_kafka_cluster_id("env-a"), None);
        assert_eq!(ctx.kafka_environment_contexts.len(), 1);
    }

    #[test]
    fn test_global_mode_ignores_environment() {
        let mut ctx = global_with(&["lkc-1"]);
        ctx.set_active_kafka_cluster("env-a", "lkc-1").unwrap();
        assert_eq!(ctx.active_kafka_cluster_id("env-b"), Some("lkc-1"));
    }

    #[test]
    fn test_delete_api_key_unsets_active_key() {
        let mut ctx = global_with(&["lkc-1"]);
        let cluster = ctx.kafka_cluster_config_mut("", "lkc-1").unwrap();
        cluster.add_api_key(ApiKeyPair::new("KEY", "SECRET"));
        cluster.set_active_api_key("KEY").unwrap();

        assert!(ctx.delete_api_key("", "KEY"));
        let cluster = ctx.kafka_cluster_config("", "lkc-1").unwrap();
        assert!(cluster.api_keys.is_empty());
        assert!(cluster.api_key.is_empty());
        assert!(!ctx.delete_api_key("", "KEY"));
    }

    #[test]
    fn test_active_key_must_be_stored() {
        let mut cluster = cluster("lkc-1");
        assert!(cluster.set_active_api_key("nope").is_err());
        cluster.api_key = "nope".into();
        assert!(cluster.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dangling_active_cluster() {
        let mut ctx = global_with(&["lkc-1"]);
        ctx.force_active_kafka_cluster("", "lkc-gone");
        let reason = ctx.validate().unwrap_err();
        assert!(reason.contains("lkc-gone"));
    }

    #[test]
    fn test_global_mode_serializes_flat() {
        let mut ctx = global_with(&["lkc-1"]);
        ctx.set_active_kafka_cluster("", "lkc-1").unwrap();
        let value = serde_json::to_value(&ctx).unwrap();

        assert_eq!(value["active_kafka"], "lkc-1");
        assert!(value["kafka_cluster_configs"]["lkc-1"].is_object());
        assert!(value.get("kafka_environment_contexts").is_none());

        let parsed: KafkaClusterContext = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, ctx);
    }
}
