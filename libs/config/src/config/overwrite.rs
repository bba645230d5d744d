//! Flag overwrites.
//!
//! Flags such as `--context`, `--environment` and `--cluster` make one
//! invocation act on a different selection without persisting it. Each
//! overwrite remembers the value it replaced; [`Config::save`] swaps the
//! remembered values back in while writing and then re-applies the flag
//! values, so the file only ever holds the user's real selection.
//!
//! Registration is first-call-wins: once an overwrite is applied, later calls
//! in the same process are ignored.

use super::Config;
use crate::error::{ConfigError, ConfigResult};

/// State of one overwritable field
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Overwrite {
    #[default]
    Unset,
    /// Flag value applied; `previous` is the value it replaced (`None` when
    /// nothing was selected)
    Applied { previous: Option<String> },
}

impl Overwrite {
    pub(crate) fn is_applied(&self) -> bool {
        matches!(self, Overwrite::Applied { .. })
    }
}

/// Overwrites registered during this process
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Overwrites {
    pub context: Overwrite,
    pub account: Overwrite,
    pub kafka: Overwrite,
}

/// Flag values taken out by the resolve step of a save
#[derive(Debug, Default)]
pub(crate) struct Resolved {
    context: Option<String>,
    account: Option<String>,
    kafka: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

impl Config {
    /// Act as if `name` were the current context for the rest of the process
    pub fn set_overwritten_curr_context(&mut self, name: &str) -> ConfigResult<()> {
        if self.overwrites.context.is_applied() {
            return Ok(());
        }
        if !self.contexts.contains_key(name) {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        let previous = non_empty(Some(self.current_context.as_str()));
        self.current_context = name.to_string();
        self.overwrites.context = Overwrite::Applied { previous };
        tracing::debug!(context = %name, "overwrote current context");
        Ok(())
    }

    /// Act as if `environment_id` were the current context's environment
    pub fn set_overwritten_account(&mut self, environment_id: &str) -> ConfigResult<()> {
        if self.overwrites.account.is_applied() {
            return Ok(());
        }
        let ctx = self.context_mut().ok_or(ConfigError::NoCurrentContext)?;
        let previous = non_empty(Some(ctx.current_environment.as_str()));
        ctx.set_current_environment(environment_id);
        self.overwrites.account = Overwrite::Applied { previous };
        tracing::debug!(environment = %environment_id, "overwrote current environment");
        Ok(())
    }

    /// Act as if `cluster_id` were the current context's active Kafka cluster.
    /// The cluster need not be cached yet.
    pub fn set_overwritten_active_kafka(&mut self, cluster_id: &str) -> ConfigResult<()> {
        if self.overwrites.kafka.is_applied() {
            return Ok(());
        }
        let ctx = self.context_mut().ok_or(ConfigError::NoCurrentContext)?;
        let previous = non_empty(ctx.active_kafka_cluster_id());
        ctx.force_active_kafka_cluster(cluster_id);
        self.overwrites.kafka = Overwrite::Applied { previous };
        tracing::debug!(cluster = %cluster_id, "overwrote active Kafka cluster");
        Ok(())
    }

    /// Record `name` as the persisted selection while `--context` is applied.
    /// Returns `false` when no context overwrite is active.
    pub(crate) fn select_under_overwrite(&mut self, name: &str) -> bool {
        match &mut self.overwrites.context {
            Overwrite::Applied { previous } => {
                *previous = Some(name.to_string());
                true
            }
            Overwrite::Unset => false,
        }
    }

    /// Keep the persisted selection in step with a deleted or renamed
    /// context. `renamed_to` is `None` for a delete.
    pub(crate) fn retarget_overwritten_context(&mut self, old: &str, renamed_to: Option<&str>) {
        if let Overwrite::Applied { previous } = &mut self.overwrites.context
            && previous.as_deref() == Some(old)
        {
            *previous = renamed_to.map(str::to_string);
        }
    }

    /// Put the pre-overwrite values back, returning the flag values.
    /// Kafka and account are resolved against the (possibly overwritten)
    /// current context before the context itself is resolved.
    pub(crate) fn resolve_overwrites(&mut self) -> Resolved {
        let kafka = self.resolve_overwritten_kafka();
        let account = self.resolve_overwritten_account();
        let context = self.resolve_overwritten_context();
        Resolved {
            context,
            account,
            kafka,
        }
    }

    /// Re-apply flag values taken out by [`Config::resolve_overwrites`]
    pub(crate) fn restore_overwrites(&mut self, resolved: Resolved) {
        if let Some(context) = resolved.context {
            self.current_context = context;
        }
        if let Some(account) = resolved.account
            && let Some(ctx) = self.context_mut()
        {
            ctx.set_current_environment(account);
        }
        if let Some(kafka) = resolved.kafka
            && let Some(ctx) = self.context_mut()
        {
            ctx.force_active_kafka_cluster(&kafka);
        }
    }

    fn resolve_overwritten_kafka(&mut self) -> Option<String> {
        let Overwrite::Applied { previous } = &self.overwrites.kafka else {
            return None;
        };
        let previous = previous.clone().unwrap_or_default();
        let ctx = self.context_mut()?;
        let flag_value = ctx.active_kafka_cluster_id().unwrap_or_default().to_string();
        ctx.force_active_kafka_cluster(&previous);
        Some(flag_value)
    }

    fn resolve_overwritten_account(&mut self) -> Option<String> {
        let Overwrite::Applied { previous } = &self.overwrites.account else {
            return None;
        };
        let previous = previous.clone().unwrap_or_default();
        let ctx = self.context_mut()?;
        let flag_value = std::mem::replace(&mut ctx.current_environment, previous);
        Some(flag_value)
    }

    fn resolve_overwritten_context(&mut self) -> Option<String> {
        let Overwrite::Applied { previous } = &self.overwrites.context else {
            return None;
        };
        let previous = previous.clone().unwrap_or_default();
        Some(std::mem::replace(&mut self.current_context, previous))
    }
}
