//! Error types for parameter editing, loading and synchronization.

use std::path::PathBuf;

use crate::parameter::types::ParameterType;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Text that cannot become a value of the target kind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("'{text}' is not a valid {kind} value")]
    InvalidScalar { kind: ParameterType, text: String },

    #[error("'{0}' is not a byte array, expected [b0,b1,...] or 0x<hex>")]
    InvalidBytes(String),

    #[error("cannot edit a value without a known type")]
    UntypedTarget,
}

/// Failures of the remote call facility.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("zenoh: {0}")]
    Zenoh(String),

    #[error("service '{0}' did not answer in time")]
    Timeout(String),

    #[error("service '{0}' returned no reply")]
    NoReply(String),

    #[error("{0}")]
    Remote(String),

    #[error("invalid service name '{0}'")]
    InvalidService(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<zenoh::Error> for TransportError {
    fn from(e: zenoh::Error) -> Self {
        Self::Zenoh(e.to_string())
    }
}

/// Errors surfaced by [`ParameterClient`](crate::client::ParameterClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{service}: {source}")]
    Transport {
        service: String,
        #[source]
        source: TransportError,
    },

    #[error("{service}: unexpected response: {source}")]
    Protocol {
        service: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("received {values} values for {names} parameter names")]
    LengthMismatch { names: usize, values: usize },

    #[error("no node selected")]
    NoNodeSelected,

    #[error("response superseded by a newer request")]
    Stale,

    #[error("parameter '{0}' is not known on the selected node")]
    UnknownParameter(String),

    #[error("parameter '{name}': {source}")]
    Codec {
        name: String,
        #[source]
        source: CodecError,
    },
}

/// Errors of the bulk parameter file loader.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read parameter file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("parameter file is for '{found}', not for node '{node}'")]
    NodeMismatch { found: String, node: String },

    #[error("line {line}: parameter '{name}': {source}")]
    Value {
        line: usize,
        name: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Invalid client or session configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid config override: {0}")]
    InvalidOverride(String),

    #[error("zenoh: {0}")]
    Zenoh(String),
}

impl From<zenoh::Error> for ConfigError {
    fn from(e: zenoh::Error) -> Self {
        Self::Zenoh(e.to_string())
    }
}
