//! Remote call facility used to reach parameter services.
//!
//! [`ServiceTransport`] is the only boundary the client depends on: call a
//! service by name with a JSON request and get a JSON response or a failure.
//! [`ZenohTransport`] implements it with zenoh queries, one query per call,
//! using the first reply.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use zenoh::{Session, Wait, key_expr::KeyExpr};

use crate::error::{ConfigError, TransportError};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Call-by-name request/response facility.
pub trait ServiceTransport: Send + Sync + 'static {
    fn call(
        &self,
        service: &str,
        request: Value,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

impl<T: ServiceTransport> ServiceTransport for Arc<T> {
    fn call(
        &self,
        service: &str,
        request: Value,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send {
        (**self).call(service, request)
    }
}

pub struct ZenohTransport {
    session: Arc<Session>,
    key_prefix: Option<String>,
    query_timeout: Duration,
}

impl ZenohTransport {
    /// Wrap an already opened session.
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            key_prefix: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Key expression a service name is reachable on.
    pub fn key_expr(&self, service: &str) -> Result<KeyExpr<'static>, TransportError> {
        service_key_expr(self.key_prefix.as_deref(), service)
    }

    pub fn shutdown(&self) -> Result<(), TransportError> {
        Ok(self.session.close().wait()?)
    }
}

/// Map `/ns/node/get_parameters` to `[prefix/]ns/node/get_parameters`.
pub fn service_key_expr(
    prefix: Option<&str>,
    service: &str,
) -> Result<KeyExpr<'static>, TransportError> {
    let name = service.trim_matches('/');
    if name.is_empty() {
        return Err(TransportError::InvalidService(service.to_string()));
    }
    let key = match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{name}"),
        None => name.to_string(),
    };
    KeyExpr::try_from(key).map_err(|_| TransportError::InvalidService(service.to_string()))
}

impl ServiceTransport for ZenohTransport {
    async fn call(&self, service: &str, request: Value) -> Result<Value, TransportError> {
        let key_expr = self.key_expr(service)?;
        let payload = serde_json::to_vec(&request)?;
        tracing::debug!("[PRM] KE: {key_expr}");

        let (tx, rx) = flume::bounded(1);
        self.session
            .get(key_expr)
            .payload(payload)
            .timeout(self.query_timeout)
            .callback(move |reply| {
                let result = match reply.into_result() {
                    Ok(sample) => Ok(sample.payload().to_bytes().into_owned()),
                    Err(err) => Err(String::from_utf8_lossy(&err.payload().to_bytes()).into_owned()),
                };
                // Only the first reply is used.
                let _ = tx.try_send(result);
            })
            .await?;

        match rx.recv_async().await {
            Ok(Ok(bytes)) => Ok(serde_json::from_slice(&bytes)?),
            Ok(Err(message)) => Err(TransportError::Remote(message)),
            Err(_) => Err(TransportError::NoReply(service.to_string())),
        }
    }
}

/// Opens the zenoh session behind a [`ZenohTransport`].
pub struct ZenohTransportBuilder {
    config_file: Option<PathBuf>,
    config_overrides: Vec<(String, Value)>,
    key_prefix: Option<String>,
    query_timeout: Duration,
}

impl Default for ZenohTransportBuilder {
    fn default() -> Self {
        Self {
            config_file: None,
            config_overrides: Vec::new(),
            key_prefix: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl ZenohTransportBuilder {
    /// Load zenoh configuration from a JSON5 file
    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Add a JSON configuration override
    ///
    /// # Example
    /// ```no_run
    /// use ros_z_param::transport::ZenohTransportBuilder;
    /// use serde_json::json;
    ///
    /// let transport = ZenohTransportBuilder::default()
    ///     .with_json("scouting/multicast/enabled", json!(false))
    ///     .with_json("connect/endpoints", json!(["tcp/127.0.0.1:7447"]))
    ///     .build()?;
    /// # Ok::<(), ros_z_param::error::ConfigError>(())
    /// ```
    pub fn with_json<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.config_overrides.push((key.into(), value));
        self
    }

    /// Convenience method: disable multicast scouting
    pub fn disable_multicast_scouting(self) -> Self {
        self.with_json("scouting/multicast/enabled", json!(false))
    }

    /// Convenience method: connect to specific endpoints
    pub fn with_connect_endpoints<I, S>(self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: Vec<String> = endpoints.into_iter().map(|s| s.into()).collect();
        self.with_json("connect/endpoints", json!(endpoints))
    }

    /// Convenience method: set mode (peer, client, router)
    pub fn with_mode<S: Into<String>>(self, mode: S) -> Self {
        self.with_json("mode", json!(mode.into()))
    }

    /// Prefix prepended to every service key expression
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn build(mut self) -> Result<ZenohTransport, ConfigError> {
        // Priority order:
        // 1. Config file passed via with_config_file()
        // 2. ROSZ_CONFIG_FILE environment variable
        // 3. Default config
        let mut config = if let Some(ref config_file) = self.config_file {
            zenoh::Config::from_file(config_file)?
        } else if let Ok(path) = std::env::var("ROSZ_CONFIG_FILE") {
            zenoh::Config::from_file(path)?
        } else {
            zenoh::Config::default()
        };

        // Environment overrides go first so explicit ones win.
        if let Ok(overrides) = std::env::var("ROSZ_CONFIG_OVERRIDE") {
            tracing::debug!(
                "Applying config overrides from ROSZ_CONFIG_OVERRIDE: {}",
                overrides
            );
            let mut parsed = parse_overrides(&overrides)?;
            parsed.append(&mut self.config_overrides);
            self.config_overrides = parsed;
        }

        for (key, value) in self.config_overrides {
            let value_str = value.to_string();
            config.insert_json5(&key, &value_str).map_err(|e| {
                ConfigError::InvalidOverride(format!("'{}' = '{}': {}", key, value_str, e))
            })?;
        }

        let session = zenoh::open(config).wait()?;
        tracing::info!(zid = %session.zid(), "Opened zenoh session");

        let transport =
            ZenohTransport::new(Arc::new(session)).with_query_timeout(self.query_timeout);
        Ok(match self.key_prefix {
            Some(prefix) => transport.with_key_prefix(prefix),
            None => transport,
        })
    }
}

/// Parse `key1=value1;key2=value2` where values are JSON5.
///
/// ```text
/// export ROSZ_CONFIG_OVERRIDE='mode="client";connect/endpoints=["tcp/192.168.1.1:7447"]'
/// ```
pub fn parse_overrides(input: &str) -> Result<Vec<(String, Value)>, ConfigError> {
    let mut overrides = Vec::new();
    for pair in input.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        // Split on first '=' only
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ConfigError::InvalidOverride(format!(
                "'{}', expected 'key=value'",
                pair
            )));
        };
        let (key, value) = (key.trim(), value.trim());
        let json_value = json5::from_str::<Value>(value).map_err(|e| {
            ConfigError::InvalidOverride(format!("'{}': {} (value: {})", key, e, value))
        })?;
        tracing::debug!("Override: {} = {}", key, json_value);
        overrides.push((key.to_string(), json_value));
    }
    Ok(overrides)
}
