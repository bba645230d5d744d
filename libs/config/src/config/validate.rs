//! Cross-entity invariants of the config.

use super::Config;
use crate::error::{ConfigError, ConfigResult};

impl Config {
    /// Check every invariant that spans entities. No I/O.
    ///
    /// Contexts without state get an empty one. Outside test mode the entry
    /// in `context_states` must equal the context's live state.
    pub fn validate(&mut self) -> ConfigResult<()> {
        let Config {
            contexts,
            context_states,
            credentials,
            platforms,
            current_context,
            filename,
            is_test,
            ..
        } = self;
        let filename = filename.as_path();

        let mut names: Vec<String> = contexts.keys().cloned().collect();
        names.sort();

        for key in &names {
            let Some(context) = contexts.get_mut(key) else {
                continue;
            };
            let corrupted = |reason: String| ConfigError::corrupted(key, filename, reason);

            if context.name.is_empty() {
                return Err(corrupted("has no name".into()));
            }
            if context.name != *key {
                return Err(corrupted(format!("is stored under the name \"{}\"", context.name)));
            }
            if context.credential_name.is_empty() {
                return Err(corrupted("has no credential".into()));
            }
            let credential = credentials.get(&context.credential_name).ok_or_else(|| {
                corrupted(format!(
                    "references credential \"{}\" which does not exist",
                    context.credential_name
                ))
            })?;
            credential.validate().map_err(&corrupted)?;
            if context.platform_name.is_empty() {
                return Err(corrupted("has no platform".into()));
            }
            if !platforms.contains_key(&context.platform_name) {
                return Err(corrupted(format!(
                    "references platform \"{}\" which does not exist",
                    context.platform_name
                )));
            }
            context.kafka_cluster_context.validate().map_err(&corrupted)?;

            let state = context
                .state
                .get_or_insert_with(|| context_states.get(key).cloned().unwrap_or_default());
            if !context_states.contains_key(key) {
                context_states.insert(key.clone(), state.clone());
            }
            if !*is_test && context_states.get(key) != Some(&*state) {
                return Err(corrupted("has session state that does not match context_states".into()));
            }
        }

        let mut state_names: Vec<&String> = context_states.keys().collect();
        state_names.sort();
        if let Some(orphan) = state_names.into_iter().find(|name| !contexts.contains_key(*name)) {
            return Err(ConfigError::corrupted(
                orphan,
                filename,
                "has session state but no context",
            ));
        }

        if !current_context.is_empty() && !contexts.contains_key(current_context.as_str()) {
            return Err(ConfigError::corrupted(
                current_context.as_str(),
                filename,
                "is the current context but does not exist",
            ));
        }
        Ok(())
    }
}
