//! Client configuration.
//!
//! Settings come from code (builder methods) and can be overridden from the
//! environment:
//!
//! - `ROSZ_PARAM_NODES_SERVICE`: service enumerating nodes
//! - `ROSZ_PARAM_TIMEOUT_MS`: per-call timeout in milliseconds
//! - `ROSZ_PARAM_COERCION`: `strict` or `lenient`

use std::time::Duration;

use crate::error::ConfigError;
use crate::parameter::codec::CoercionMode;

pub const DEFAULT_NODES_SERVICE: &str = "/rosapi/nodes";
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

const ENV_NODES_SERVICE: &str = "ROSZ_PARAM_NODES_SERVICE";
const ENV_TIMEOUT_MS: &str = "ROSZ_PARAM_TIMEOUT_MS";
const ENV_COERCION: &str = "ROSZ_PARAM_COERCION";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub nodes_service: String,
    pub call_timeout: Duration,
    pub coercion: CoercionMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nodes_service: DEFAULT_NODES_SERVICE.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            coercion: CoercionMode::default(),
        }
    }
}

impl ClientConfig {
    /// Set the service used to enumerate nodes
    pub fn with_nodes_service<S: Into<String>>(mut self, service: S) -> Self {
        self.nodes_service = service.into();
        self
    }

    /// Set the timeout applied to every remote call
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set how operator text is coerced into typed values
    pub fn with_coercion(mut self, mode: CoercionMode) -> Self {
        self.coercion = mode;
        self
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(service) = lookup(ENV_NODES_SERVICE) {
            tracing::debug!("Nodes service from {}: {}", ENV_NODES_SERVICE, service);
            self.nodes_service = service;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            self.call_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(ENV_COERCION) {
            self.coercion = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_COERCION,
                value: raw.clone(),
            })?;
        }

        Ok(self)
    }
}
