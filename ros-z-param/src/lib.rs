//! Inspect and edit the parameters of remote ROS 2 nodes over zenoh.

pub mod client;
pub mod config;
pub mod error;
pub mod parameter;
pub mod transport;

pub use client::{ClientPhase, CommitReport, LoadOutcome, ParameterClient};
pub use config::ClientConfig;
pub use error::{ClientError, CodecError, ConfigError, LoadError, Result, TransportError};
pub use parameter::{
    CoercionMode, OverlayStore, Parameter, ParameterSet, ParameterType, ParameterValue,
    PendingValue,
};
pub use transport::{ServiceTransport, ZenohTransport, ZenohTransportBuilder};
