//! Schema Registry clusters cached per environment.

use serde::{Deserialize, Serialize};

use crate::credential::ApiKeyPair;
use crate::error::ConfigResult;

/// A Schema Registry cluster and the credentials used to reach it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct SchemaRegistryCluster {
    #[serde(default)]
    pub id: String,
    pub schema_registry_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_credentials: Option<ApiKeyPair>,
}

impl SchemaRegistryCluster {
    pub fn encrypt_secrets(&mut self) -> ConfigResult<()> {
        match self.src_credentials.as_mut() {
            Some(pair) => pair.encrypt_secret(),
            None => Ok(()),
        }
    }

    pub fn decrypt_secrets(&mut self) -> ConfigResult<()> {
        match self.src_credentials.as_mut() {
            Some(pair) => pair.decrypt_secret(),
            None => Ok(()),
        }
    }
}
