//! Parameter values, staged edits and parameter files on the client side.
//!
//! - **Types** for the nine ROS 2 parameter kinds and their wire layout
//! - **Codec** between typed values and operator text
//! - **Overlay** of staged edits keyed by parameter name
//! - **Loader** for `ros__parameters` documents
//!
//! # Data flow
//!
//! ```text
//! get_parameters ──► ParameterSet ──► decode_for_display ──► operator
//!                        │
//!                        ▼
//! operator text ──► encode_from_text ──► OverlayStore ──► set_parameters
//!                        ▲
//! parameter file ──► loader
//! ```

pub mod codec;
pub mod loader;
pub mod overlay;
pub mod store;
pub mod types;
pub mod wire_types;

pub use codec::{CoercionMode, decode_for_display, encode_from_text};
pub use loader::{LoadEntry, LoadReport};
pub use overlay::{OverlayStore, PendingValue};
pub use store::ParameterSet;
pub use types::{Parameter, ParameterType, ParameterValue, type_name};
