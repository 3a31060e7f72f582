//! Process configuration read from the environment.

use thiserror::Error;
use tracing::warn;

/// Port served by the health server when `HEALTH_PORT` is unset
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Errors raised while reading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {variable}: {reason}")]
    Invalid {
        variable: &'static str,
        value: String,
        reason: String,
    },
}

/// Operator process configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Identity used for leader election and event reporting
    pub pod_name: String,
    /// Namespace holding the leader election lease
    pub pod_namespace: String,
    /// Restrict watches to one namespace; `None` watches cluster-wide
    pub watch_namespace: Option<String>,
    /// Port for `/healthz`, `/readyz` and `/metrics`
    pub health_port: u16,
}

impl OperatorConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let pod_name = non_empty(lookup("POD_NAME")).unwrap_or_else(|| {
            warn!("POD_NAME not set, using hostname");
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        });
        let pod_namespace = non_empty(lookup("POD_NAMESPACE")).unwrap_or_else(|| {
            warn!("POD_NAMESPACE not set, using 'default'");
            "default".to_string()
        });
        let watch_namespace = non_empty(lookup("WATCH_NAMESPACE"));
        let health_port = match non_empty(lookup("HEALTH_PORT")) {
            Some(value) => value.parse::<u16>().map_err(|e| {
                ConfigError::Invalid {
                    variable: "HEALTH_PORT",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_HEALTH_PORT,
        };

        Ok(Self {
            pod_name,
            pod_namespace,
            watch_namespace,
            health_port,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
