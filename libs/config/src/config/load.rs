//! Reading the config from disk.

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

use super::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::migration::Migrator;

impl Config {
    /// Load the config from `path`, `TENANTCTL_CONFIG_FILE` or the default
    /// location, in that order.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> ConfigResult<Self> {
        Self::load_from(Self::config_path(path))
    }

    /// Load the config file at `path`.
    ///
    /// A missing file is replaced by a fresh default config. Older or newer
    /// schema versions go through the migration chain; a migrated file is
    /// written back once.
    pub fn load_from(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let mut config = Config::new(&path);
                config.save()?;
                tracing::debug!(path = %path.display(), "created default config");
                return Ok(config);
            }
            Err(e) => return Err(ConfigError::io("read", &path, e)),
        };

        let document: Value = serde_json::from_str(&content)?;
        let (document, migrated) = Migrator::default().run(document, &path)?;
        check_context_documents(&document, &path)?;

        let mut config: Config = serde_json::from_value(document)?;
        config.filename = path;
        config.link_contexts()?;
        config.validate()?;

        if migrated {
            config.save()?;
            tracing::debug!(path = %config.filename.display(), "saved migrated config");
        }
        Ok(config)
    }

    /// Attach the credential, platform and decrypted session state that are
    /// stored outside each context.
    fn link_contexts(&mut self) -> ConfigResult<()> {
        let Config {
            contexts,
            context_states,
            credentials,
            platforms,
            filename,
            ..
        } = self;
        let filename = filename.as_path();

        for (name, context) in contexts.iter_mut() {
            let credential = credentials.get(&context.credential_name).cloned().ok_or_else(|| {
                ConfigError::corrupted(
                    name,
                    filename,
                    format!(
                        "references credential \"{}\" which does not exist",
                        context.credential_name
                    ),
                )
            })?;
            let platform = platforms.get(&context.platform_name).cloned().ok_or_else(|| {
                ConfigError::corrupted(
                    name,
                    filename,
                    format!(
                        "references platform \"{}\" which does not exist",
                        context.platform_name
                    ),
                )
            })?;
            context.credential = Some(credential);
            context.platform = Some(platform);

            if let Some(state) = context_states.get_mut(name) {
                state.decrypt_tokens(name)?;
                context.state = Some(state.clone());
            }
        }
        Ok(())
    }
}

/// Structural checks on the raw document, before it is bound to types, so a
/// hand-edited file gets a corrupted-config error naming the context rather
/// than a parse error.
fn check_context_documents(document: &Value, path: &Path) -> ConfigResult<()> {
    let Some(contexts) = document.get("contexts").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, context) in contexts {
        let field = |name: &str| context.get(name).and_then(Value::as_str).unwrap_or_default();
        let reason = if field("name").is_empty() {
            "has no name"
        } else if field("credential").is_empty() {
            "has no credential"
        } else if field("platform").is_empty() {
            "has no platform"
        } else if context
            .get("kafka_cluster_context")
            .is_none_or(Value::is_null)
        {
            "has no Kafka cluster context"
        } else {
            continue;
        };
        return Err(ConfigError::corrupted(key, path, reason));
    }
    Ok(())
}
