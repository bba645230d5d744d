//! Persistent configuration and authentication contexts for `tenantctl`.
//!
//! The [`Config`] aggregate owns named [`Context`]s, each binding a
//! [`Platform`], a [`Credential`] and the cached session of the user. It is
//! loaded once per process with [`Config::load`], passed by reference to the
//! commands that need it, and written back with [`Config::save`]. Secrets and
//! tokens are encrypted at rest; files from older releases are migrated on
//! load.

mod config;
mod context;
mod credential;
mod environment;
mod error;
pub mod fields;
mod kafka;
pub mod migration;
mod platform;
mod schema_registry;
mod secret;
mod state;

pub use config::{
    ANONYMOUS_CLUSTER_ID, CONFIG_FILE_ENV, CONFIG_PATH, CURRENT_VERSION, Config, NewContext,
    ORGANIZATION_ID_ENV,
};
pub use context::Context;
pub use credential::{ApiKeyPair, Credential, CredentialType, LoginCredential};
pub use environment::EnvironmentContext;
pub use error::{ConfigError, ConfigResult};
pub use kafka::{KafkaClusterConfig, KafkaClusterContext, KafkaEnvContext};
pub use migration::{Migration, Migrator};
pub use platform::{CLOUD_DOMAINS, Platform, platform_name};
pub use schema_registry::SchemaRegistryCluster;
pub use state::{Account, AuthConfig, ContextState, Organization, User};
