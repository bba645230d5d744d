//! Migration from the unversioned layout.
//!
//! The first releases wrote a single login at the top level of the file,
//! keyed platforms and credentials by arbitrary names, stored the credential
//! type as a number and keyed Schema Registry clusters by cluster id. The
//! current layout derives platform and credential names from their content,
//! keeps session state per context and keys Schema Registry clusters by
//! environment.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use super::{Migration, UNVERSIONED};
use crate::config::{CURRENT_VERSION, Config};
use crate::context::Context;
use crate::credential::{ApiKeyPair, Credential};
use crate::error::{ConfigError, ConfigResult};
use crate::kafka::{KafkaClusterConfig, KafkaClusterContext};
use crate::platform::Platform;
use crate::schema_registry::SchemaRegistryCluster;
use crate::state::{Account, AuthConfig, ContextState, User};

#[derive(Deserialize, Debug, Default)]
struct ConfigV0 {
    #[serde(default)]
    disable_update_check: bool,
    #[serde(default)]
    disable_updates: bool,
    #[serde(default)]
    auth: Option<AuthV0>,
    #[serde(default)]
    auth_token: String,
    #[serde(default)]
    platforms: HashMap<String, PlatformV0>,
    #[serde(default)]
    credentials: HashMap<String, CredentialV0>,
    #[serde(default)]
    contexts: HashMap<String, ContextV0>,
    #[serde(default)]
    current_context: String,
    #[serde(default)]
    anonymous_id: String,
}

#[derive(Deserialize, Debug, Default)]
struct AuthV0 {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    account: Option<Account>,
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Deserialize, Debug)]
struct PlatformV0 {
    server: String,
    #[serde(default)]
    ca_cert_path: String,
}

#[derive(Deserialize, Debug)]
struct CredentialV0 {
    #[serde(default)]
    username: String,
    #[serde(default)]
    api_key_pair: Option<ApiKeyPairV0>,
    /// 0 = username, 1 = API key
    #[serde(default)]
    credential_type: u8,
}

#[derive(Deserialize, Debug, Clone)]
struct ApiKeyPairV0 {
    key: String,
    #[serde(default)]
    secret: String,
}

impl From<ApiKeyPairV0> for ApiKeyPair {
    fn from(old: ApiKeyPairV0) -> Self {
        ApiKeyPair::new(old.key, old.secret)
    }
}

#[derive(Deserialize, Debug)]
struct ContextV0 {
    #[serde(default)]
    platform: String,
    #[serde(default)]
    credential: String,
    #[serde(default)]
    kafka_clusters: HashMap<String, KafkaClusterV0>,
    /// Active Kafka cluster id
    #[serde(default)]
    kafka: String,
    /// Keyed by Schema Registry cluster id
    #[serde(default)]
    schema_registry_clusters: HashMap<String, SchemaRegistryV0>,
}

#[derive(Deserialize, Debug)]
struct KafkaClusterV0 {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    bootstrap_servers: String,
    #[serde(default)]
    api_endpoint: String,
    #[serde(default)]
    api_keys: HashMap<String, ApiKeyPairV0>,
    #[serde(default)]
    api_key: String,
}

#[derive(Deserialize, Debug)]
struct SchemaRegistryV0 {
    environment_id: String,
    #[serde(default)]
    schema_registry_endpoint: String,
    #[serde(default)]
    src_credentials: Option<ApiKeyPairV0>,
}

/// Rewrites an unversioned document into the current layout
pub struct V0ToV1;

impl Migration for V0ToV1 {
    fn from_version(&self) -> &'static str {
        UNVERSIONED
    }

    fn to_version(&self) -> &'static str {
        CURRENT_VERSION
    }

    fn migrate(&self, document: Value) -> ConfigResult<Value> {
        let old: ConfigV0 = serde_json::from_value(document)?;
        let config = upgrade(old)?;
        Ok(serde_json::to_value(&config)?)
    }
}

fn upgrade(old: ConfigV0) -> ConfigResult<Config> {
    let mut config = Config::new(PathBuf::new());
    config.disable_update_check = old.disable_update_check;
    config.disable_updates = old.disable_updates;
    config.current_context = old.current_context;
    if !old.anonymous_id.is_empty() {
        config.anonymous_id = old.anonymous_id;
    }

    let mut platform_names = HashMap::new();
    for (old_name, old_platform) in old.platforms {
        let platform = Platform::new(old_platform.server).with_ca_cert_path(old_platform.ca_cert_path);
        platform_names.insert(old_name, platform.name.clone());
        config.platforms.insert(platform.name.clone(), platform);
    }

    let mut credential_names = HashMap::new();
    for (old_name, old_credential) in old.credentials {
        let credential = upgrade_credential(&old_name, old_credential)?;
        credential_names.insert(old_name, credential.name.clone());
        config.credentials.insert(credential.name.clone(), credential);
    }

    let auth = old.auth.map(|auth| AuthConfig {
        user: auth.user,
        organization: None,
        account: auth.account,
        accounts: auth.accounts,
    });

    for (name, old_context) in old.contexts {
        let platform_name = platform_names.get(&old_context.platform).ok_or_else(|| {
            ConfigError::migration(format!(
                "context \"{name}\" references unknown platform \"{}\"",
                old_context.platform
            ))
        })?;
        let credential_name = credential_names.get(&old_context.credential).ok_or_else(|| {
            ConfigError::migration(format!(
                "context \"{name}\" references unknown credential \"{}\"",
                old_context.credential
            ))
        })?;
        let platform = config.platforms.get(platform_name).cloned();
        let credential = config.credentials.get(credential_name).cloned();
        let (Some(platform), Some(credential)) = (platform, credential) else {
            continue;
        };

        let clusters = old_context
            .kafka_clusters
            .into_values()
            .map(|cluster| (cluster.id.clone(), upgrade_cluster(cluster)))
            .collect();
        let mut context = Context::new(
            &name,
            platform,
            credential,
            KafkaClusterContext::with_clusters(clusters, old_context.kafka),
        );
        context.schema_registry_clusters = old_context
            .schema_registry_clusters
            .into_iter()
            .map(|(cluster_id, sr)| {
                let cluster = SchemaRegistryCluster {
                    id: cluster_id,
                    schema_registry_endpoint: sr.schema_registry_endpoint,
                    src_credentials: sr.src_credentials.map(ApiKeyPair::from),
                };
                (sr.environment_id, cluster)
            })
            .collect();

        let state = ContextState {
            auth: auth.clone(),
            auth_token: old.auth_token.clone(),
            ..ContextState::default()
        };
        context.state = Some(state.clone());
        config.context_states.insert(name.clone(), state);
        config.contexts.insert(name, context);
    }

    tracing::debug!(contexts = config.contexts.len(), "upgraded unversioned config");
    Ok(config)
}

fn upgrade_credential(old_name: &str, old: CredentialV0) -> ConfigResult<Credential> {
    match old.credential_type {
        0 => Ok(Credential::username(old.username, String::new())),
        1 => {
            let pair = old.api_key_pair.ok_or_else(|| {
                ConfigError::migration(format!("API key credential \"{old_name}\" has no key pair"))
            })?;
            Ok(Credential::api_key(pair.into()))
        }
        other => Err(ConfigError::migration(format!(
            "credential \"{old_name}\" has unknown type {other}"
        ))),
    }
}

fn upgrade_cluster(old: KafkaClusterV0) -> KafkaClusterConfig {
    let mut cluster = KafkaClusterConfig::new(old.id, old.name, old.bootstrap_servers);
    cluster.api_endpoint = old.api_endpoint;
    for pair in old.api_keys.into_values() {
        cluster.add_api_key(pair.into());
    }
    cluster.api_key = old.api_key;
    cluster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialType;
    use serde_json::json;

    fn v0_document() -> Value {
        json!({
            "auth": {
                "user": {"id": "42", "email": "ada@example.com"},
                "account": {"id": "env-1", "name": "default"},
                "accounts": [{"id": "env-1", "name": "default"}]
            },
            "auth_token": "tok-123",
            "platforms": {
                "prod": {"server": "https://tenantctl.cloud"}
            },
            "credentials": {
                "mine": {"username": "ada@example.com", "credential_type": 0}
            },
            "contexts": {
                "login": {
                    "platform": "prod",
                    "credential": "mine",
                    "kafka_clusters": {
                        "lkc-1": {
                            "id": "lkc-1",
                            "name": "orders",
                            "bootstrap_servers": "pkc.example.com:9092",
                            "api_keys": {"K1": {"key": "K1", "secret": "S1"}},
                            "api_key": "K1"
                        }
                    },
                    "kafka": "lkc-1",
                    "schema_registry_clusters": {
                        "lsrc-9": {
                            "environment_id": "env-1",
                            "schema_registry_endpoint": "https://sr.example.com"
                        }
                    }
                }
            },
            "current_context": "login",
            "anonymous_id": "anon-1"
        })
    }

    fn upgraded() -> Config {
        let value = V0ToV1.migrate(v0_document()).unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_version_is_current() {
        let value = V0ToV1.migrate(v0_document()).unwrap();
        assert_eq!(value["version"], CURRENT_VERSION);
    }

    #[test]
    fn test_names_are_derived_from_content() {
        let config = upgraded();
        assert!(config.platforms.contains_key("tenantctl.cloud"));
        assert!(config.credentials.contains_key("username-ada@example.com"));

        let ctx = &config.contexts["login"];
        assert_eq!(ctx.name, "login");
        assert_eq!(ctx.platform_name, "tenantctl.cloud");
        assert_eq!(ctx.credential_name, "username-ada@example.com");
        assert_eq!(config.current_context, "login");
        assert_eq!(config.anonymous_id, "anon-1");
    }

    #[test]
    fn test_session_moves_into_context_state() {
        let config = upgraded();
        let state = &config.context_states["login"];
        assert_eq!(state.auth_token, "tok-123");
        let auth = state.auth.as_ref().unwrap();
        assert_eq!(auth.user.as_ref().unwrap().email, "ada@example.com");
        assert_eq!(auth.account.as_ref().unwrap().id, "env-1");
    }

    #[test]
    fn test_kafka_clusters_keep_active_selection() {
        let config = upgraded();
        let kafka = &config.contexts["login"].kafka_cluster_context;
        assert_eq!(kafka.active_kafka_cluster_id(""), Some("lkc-1"));
        let cluster = kafka.kafka_cluster_config("", "lkc-1").unwrap();
        assert_eq!(cluster.bootstrap, "pkc.example.com:9092");
        assert_eq!(cluster.active_api_key_pair().unwrap().secret, "S1");
    }

    #[test]
    fn test_schema_registry_rekeyed_by_environment() {
        let config = upgraded();
        let sr = &config.contexts["login"].schema_registry_clusters["env-1"];
        assert_eq!(sr.id, "lsrc-9");
        assert_eq!(sr.schema_registry_endpoint, "https://sr.example.com");
    }

    #[test]
    fn test_api_key_credential() {
        let mut doc = v0_document();
        doc["credentials"]["mine"] = json!({
            "api_key_pair": {"key": "K9", "secret": "S9"},
            "credential_type": 1
        });
        let config: Config = serde_json::from_value(V0ToV1.migrate(doc).unwrap()).unwrap();
        let credential = &config.credentials["api-key-K9"];
        assert_eq!(credential.credential_type, CredentialType::ApiKey);
        assert_eq!(config.contexts["login"].credential_name, "api-key-K9");
    }

    #[test]
    fn test_unknown_credential_type_fails() {
        let mut doc = v0_document();
        doc["credentials"]["mine"]["credential_type"] = json!(7);
        let err = V0ToV1.migrate(doc).unwrap_err();
        assert!(matches!(err, ConfigError::Migration(ref msg) if msg.contains("unknown type 7")));
    }

    #[test]
    fn test_dangling_platform_fails() {
        let mut doc = v0_document();
        doc["contexts"]["login"]["platform"] = json!("nowhere");
        let err = V0ToV1.migrate(doc).unwrap_err();
        assert!(matches!(err, ConfigError::Migration(ref msg) if msg.contains("nowhere")));
    }
}
