//! Per-environment sticky selections of a context.

use serde::{Deserialize, Serialize};

/// Resources selected within one environment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct EnvironmentContext {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_flink_compute_pool: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_identity_pool: String,
}

impl EnvironmentContext {
    pub fn is_empty(&self) -> bool {
        self.current_flink_compute_pool.is_empty() && self.current_identity_pool.is_empty()
    }
}
