//! Configuration error types

use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading, mutating or saving the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A structural invariant of the config file does not hold
    #[error(
        "the configuration file at \"{path}\" is corrupted: context \"{context}\" {reason}. \
         Fix or delete the file to continue"
    )]
    Corrupted {
        context: String,
        path: String,
        reason: String,
    },

    /// The file was written by an older schema and no migration applies
    #[error(
        "the configuration file at \"{path}\" is out of date (version {found}, expected {expected}). \
         Upgrade it with a previous release or delete the file"
    )]
    OutOfDate {
        found: String,
        expected: String,
        path: String,
    },

    /// The file was written by a newer, incompatible schema
    #[error(
        "unsupported configuration version {found} in \"{path}\" (this release reads version {expected})"
    )]
    UnsupportedVersion {
        found: String,
        expected: String,
        path: String,
    },

    /// Context lookup by name failed
    #[error("context \"{0}\" does not exist")]
    ContextNotFound(String),

    /// Credential lookup by name failed
    #[error("credential \"{0}\" does not exist")]
    CredentialNotFound(String),

    /// Platform lookup by name failed
    #[error("platform \"{0}\" does not exist")]
    PlatformNotFound(String),

    /// Kafka cluster is not among the known cluster configs
    #[error("Kafka cluster \"{0}\" is not known to the current context")]
    KafkaClusterNotFound(String),

    /// API key is not among the known keys of a cluster
    #[error("API key \"{0}\" is not stored for this cluster")]
    ApiKeyNotFound(String),

    /// An entity with the same name already exists
    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// Operation requires a current context
    #[error("no context is selected. Select an existing context with `tenantctl context use`")]
    NoCurrentContext,

    /// A credential's type cannot change once created
    #[error("credential \"{name}\" is of type {existing} and cannot be replaced by type {requested}")]
    CredentialTypeChange {
        name: String,
        existing: String,
        requested: String,
    },

    /// Caller supplied an unusable value
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Key derivation or cipher failure
    #[error("encryption error: {0}")]
    Crypto(String),

    /// A schema migration could not be applied
    #[error("config migration failed: {0}")]
    Migration(String),

    /// File system failure
    #[error("failed to {action} \"{path}\": {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create a corrupted-config error for a context in the file at `path`
    pub fn corrupted(context: impl Into<String>, path: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            context: context.into(),
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the failed action and path
    pub fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.display().to_string(),
            source,
        }
    }

    /// Create an already-exists error
    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Create a migration error
    pub fn migration(msg: impl Into<String>) -> Self {
        Self::Migration(msg.into())
    }

    /// Whether this error reports a structural corruption of the config file
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
