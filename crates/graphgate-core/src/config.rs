//! Configuration for the graphgate gateway.
//!
//! Configuration is loaded once at startup from (in priority order):
//! 1. Environment variables (`GRAPHGATE__` prefix, `__` separator)
//! 2. Config file (`graphgate.toml`, `[gateway]` table)
//! 3. Defaults
//!
//! The resulting [`GatewayConfig`] is immutable and handed to each component
//! at construction.

use serde::Deserialize;

use crate::error::{GatewayError, Result};
use crate::types::NamespaceId;
use crate::validate;

/// What the strict-mode gate does when it cannot reach the backend.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateFailurePolicy {
    /// Log a warning and let the operation proceed.
    #[default]
    AllowAndWarn,
    /// Reject the operation with `BackendUnavailable`.
    Deny,
}

/// Neo4j connection settings.
#[derive(Clone, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl BackendSettings {
    pub fn uri(&self) -> String {
        format!("bolt://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &crate::redact::REDACTED)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
        }
    }
}

/// Process-wide gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Namespace used when a request names none. Always exempt from the gate.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Require namespaces to be created before they are written or searched.
    #[serde(default = "default_true")]
    pub strict_mode: bool,

    /// Gate behavior when the existence check itself fails.
    #[serde(default)]
    pub gate_failure: GateFailurePolicy,

    /// Maximum search hits returned when the caller gives no limit.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Upper bound on a single operation, enforced by the caller.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub neo4j: BackendSettings,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_search_limit() -> u32 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    7687
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "graphgate-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            strict_mode: true,
            gate_failure: GateFailurePolicy::default(),
            search_limit: default_search_limit(),
            request_timeout_secs: default_request_timeout(),
            neo4j: BackendSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from `<file_prefix>.toml` (optional) and `GRAPHGATE__*` env vars.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("GRAPHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GatewayError::InvalidArgument {
                namespace: None,
                field: "config",
                message: e.to_string(),
            })?;

        let loaded = match cfg.get::<GatewayConfig>("gateway") {
            Ok(c) => c,
            Err(config::ConfigError::NotFound(_)) => {
                tracing::debug!(file = file_prefix, "No [gateway] settings found, using defaults");
                GatewayConfig::default()
            }
            Err(e) => {
                return Err(GatewayError::InvalidArgument {
                    namespace: None,
                    field: "config",
                    message: e.to_string(),
                })
            }
        };

        loaded.validate()
    }

    /// Check invariants that serde defaults cannot express.
    pub fn validate(self) -> Result<Self> {
        validate::validate_tenant_id(&self.default_namespace)?;
        if self.search_limit == 0 {
            return Err(GatewayError::InvalidArgument {
                namespace: None,
                field: "search_limit",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    /// The default namespace as a validated id.
    pub fn default_namespace_id(&self) -> Result<NamespaceId> {
        NamespaceId::parse(&self.default_namespace)
    }
}
