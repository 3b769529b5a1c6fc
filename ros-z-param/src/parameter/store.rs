//! The authoritative parameter snapshot of one node.
//!
//! `ParameterSet` is rebuilt from scratch on every successful fetch and never
//! merged, so it always reflects a single consistent read of the remote node.

use indexmap::IndexMap;

use super::types::{Parameter, ParameterValue};
use super::wire_types::WireParameterValue;
use crate::error::ClientError;

#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: IndexMap<String, Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair listed names with fetched values by position.
    ///
    /// The two sequences must have the same length; a short or long value
    /// list is a protocol violation and nothing is built.
    pub fn from_fetch(
        names: &[String],
        values: &[WireParameterValue],
    ) -> Result<Self, ClientError> {
        if names.len() != values.len() {
            return Err(ClientError::LengthMismatch {
                names: names.len(),
                values: values.len(),
            });
        }
        let parameters = names
            .iter()
            .zip(values)
            .map(|(name, wire)| {
                (
                    name.clone(),
                    Parameter::new(name.clone(), ParameterValue::from_wire(wire)),
                )
            })
            .collect();
        Ok(Self { parameters })
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name).map(|p| &p.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
