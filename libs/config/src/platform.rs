//! Backend deployments a context can point at.

use serde::{Deserialize, Serialize};

/// Host suffixes of the multi-tenant cloud service
pub const CLOUD_DOMAINS: &[&str] = &["tenantctl.cloud", "tenantctl-devel.cloud"];

/// A backend deployment, identified by its server URL
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Platform {
    pub name: String,
    pub server: String,
    /// Path to a CA bundle for self-hosted deployments with private certificates
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_cert_path: String,
}

impl Platform {
    /// Create a platform named after its server URL
    pub fn new(server: impl Into<String>) -> Self {
        let server = server.into();
        Platform {
            name: platform_name(&server),
            server,
            ca_cert_path: String::new(),
        }
    }

    pub fn with_ca_cert_path(mut self, ca_cert_path: impl Into<String>) -> Self {
        self.ca_cert_path = ca_cert_path.into();
        self
    }

    /// Host portion of the server URL, without scheme, port or path
    pub fn host(&self) -> &str {
        let without_scheme = self
            .server
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.server);
        without_scheme
            .split(['/', ':', '?'])
            .next()
            .unwrap_or(without_scheme)
    }

    /// Whether the server belongs to the multi-tenant cloud service
    pub fn is_cloud(&self) -> bool {
        let host = self.host();
        CLOUD_DOMAINS
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }
}

/// Platform names are the server URL with the `https://` scheme stripped.
pub fn platform_name(server: &str) -> String {
    server.strip_prefix("https://").unwrap_or(server).to_string()
}
