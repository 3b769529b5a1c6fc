//! User-facing parameter types.
//!
//! These types provide an ergonomic Rust API over the flat wire layout. A
//! [`ParameterValue`] always carries exactly one payload, so the "one active
//! field per tag" rule of the wire format holds by construction.

use strum::{Display, IntoStaticStr};

use super::wire_types::{WireParameter, WireParameterValue, parameter_type};

/// The type of a parameter value.
///
/// The `Display` form is the name shown next to a parameter in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ParameterType {
    #[strum(serialize = "not_set")]
    NotSet,
    #[strum(serialize = "boolean")]
    Bool,
    #[strum(serialize = "integer")]
    Integer,
    #[strum(serialize = "double")]
    Double,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "byte_array")]
    ByteArray,
    #[strum(serialize = "boolean_array")]
    BoolArray,
    #[strum(serialize = "integer_array")]
    IntegerArray,
    #[strum(serialize = "double_array")]
    DoubleArray,
    #[strum(serialize = "string_array")]
    StringArray,
}

impl ParameterType {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::NotSet => parameter_type::NOT_SET,
            Self::Bool => parameter_type::BOOL,
            Self::Integer => parameter_type::INTEGER,
            Self::Double => parameter_type::DOUBLE,
            Self::String => parameter_type::STRING,
            Self::ByteArray => parameter_type::BYTE_ARRAY,
            Self::BoolArray => parameter_type::BOOL_ARRAY,
            Self::IntegerArray => parameter_type::INTEGER_ARRAY,
            Self::DoubleArray => parameter_type::DOUBLE_ARRAY,
            Self::StringArray => parameter_type::STRING_ARRAY,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            parameter_type::BOOL => Self::Bool,
            parameter_type::INTEGER => Self::Integer,
            parameter_type::DOUBLE => Self::Double,
            parameter_type::STRING => Self::String,
            parameter_type::BYTE_ARRAY => Self::ByteArray,
            parameter_type::BOOL_ARRAY => Self::BoolArray,
            parameter_type::INTEGER_ARRAY => Self::IntegerArray,
            parameter_type::DOUBLE_ARRAY => Self::DoubleArray,
            parameter_type::STRING_ARRAY => Self::StringArray,
            _ => Self::NotSet,
        }
    }
}

/// Display name for an optional value's type, `undefined` when absent.
pub fn type_name(value: Option<&ParameterValue>) -> &'static str {
    match value {
        None => "undefined",
        Some(ParameterValue::Invalid(_)) => "invalid",
        Some(v) => v.parameter_type().into(),
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParameterValue {
    #[default]
    NotSet,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(std::string::String),
    ByteArray(Vec<u8>),
    BoolArray(Vec<bool>),
    IntegerArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<std::string::String>),
    /// A wire value whose type byte is not a known discriminant.
    Invalid(u8),
}

impl ParameterValue {
    /// Returns the parameter type of this value.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::NotSet | Self::Invalid(_) => ParameterType::NotSet,
            Self::Bool(_) => ParameterType::Bool,
            Self::Integer(_) => ParameterType::Integer,
            Self::Double(_) => ParameterType::Double,
            Self::String(_) => ParameterType::String,
            Self::ByteArray(_) => ParameterType::ByteArray,
            Self::BoolArray(_) => ParameterType::BoolArray,
            Self::IntegerArray(_) => ParameterType::IntegerArray,
            Self::DoubleArray(_) => ParameterType::DoubleArray,
            Self::StringArray(_) => ParameterType::StringArray,
        }
    }

    /// Convert to wire format.
    pub fn to_wire(&self) -> WireParameterValue {
        let mut wire = WireParameterValue {
            r#type: match self {
                Self::Invalid(tag) => *tag,
                other => other.parameter_type().to_u8(),
            },
            ..Default::default()
        };
        match self {
            Self::NotSet | Self::Invalid(_) => {}
            Self::Bool(v) => wire.bool_value = *v,
            Self::Integer(v) => wire.integer_value = *v,
            Self::Double(v) => wire.double_value = *v,
            Self::String(v) => wire.string_value = v.clone(),
            Self::ByteArray(v) => wire.byte_array_value = v.clone(),
            Self::BoolArray(v) => wire.bool_array_value = v.clone(),
            Self::IntegerArray(v) => wire.integer_array_value = v.clone(),
            Self::DoubleArray(v) => wire.double_array_value = v.clone(),
            Self::StringArray(v) => wire.string_array_value = v.clone(),
        }
        wire
    }

    /// Convert from wire format.
    pub fn from_wire(wire: &WireParameterValue) -> Self {
        match wire.r#type {
            parameter_type::NOT_SET => Self::NotSet,
            parameter_type::BOOL => Self::Bool(wire.bool_value),
            parameter_type::INTEGER => Self::Integer(wire.integer_value),
            parameter_type::DOUBLE => Self::Double(wire.double_value),
            parameter_type::STRING => Self::String(wire.string_value.clone()),
            parameter_type::BYTE_ARRAY => Self::ByteArray(wire.byte_array_value.clone()),
            parameter_type::BOOL_ARRAY => Self::BoolArray(wire.bool_array_value.clone()),
            parameter_type::INTEGER_ARRAY => Self::IntegerArray(wire.integer_array_value.clone()),
            parameter_type::DOUBLE_ARRAY => Self::DoubleArray(wire.double_array_value.clone()),
            parameter_type::STRING_ARRAY => Self::StringArray(wire.string_array_value.clone()),
            other => Self::Invalid(other),
        }
    }
}

/// A parameter with its name and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: std::string::String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: impl Into<std::string::String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn to_wire(&self) -> WireParameter {
        WireParameter {
            name: self.name.clone(),
            value: self.value.to_wire(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_conversion_keeps_single_payload() {
        let wire = ParameterValue::IntegerArray(vec![1, 2, 3]).to_wire();
        assert_eq!(wire.r#type, parameter_type::INTEGER_ARRAY);
        assert_eq!(wire.integer_array_value, vec![1, 2, 3]);
        assert!(wire.double_array_value.is_empty());
        assert_eq!(wire.integer_value, 0);
    }

    #[test]
    fn test_unknown_tag_is_invalid() {
        let wire = WireParameterValue {
            r#type: 42,
            ..Default::default()
        };
        assert_eq!(ParameterValue::from_wire(&wire), ParameterValue::Invalid(42));
        assert_eq!(
            ParameterValue::Invalid(42).parameter_type(),
            ParameterType::NotSet
        );
    }

    #[test]
    fn test_every_kind_survives_the_wire() {
        let values = [
            ParameterValue::Bool(true),
            ParameterValue::Integer(-4),
            ParameterValue::Double(0.25),
            ParameterValue::String("hi".into()),
            ParameterValue::ByteArray(vec![0, 255]),
            ParameterValue::BoolArray(vec![false, true]),
            ParameterValue::IntegerArray(vec![i64::MIN, i64::MAX]),
            ParameterValue::DoubleArray(vec![1.5]),
            ParameterValue::StringArray(vec!["a".into(), "b".into()]),
        ];
        for value in values {
            assert_eq!(ParameterValue::from_wire(&value.to_wire()), value);
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ParameterType::Bool.to_string(), "boolean");
        let name: &str = ParameterType::StringArray.into();
        assert_eq!(name, "string_array");
        assert_eq!(type_name(None), "undefined");
        assert_eq!(type_name(Some(&ParameterValue::Double(1.0))), "double");
        assert_eq!(ParameterType::from_u8(7), ParameterType::IntegerArray);
        assert_eq!(ParameterType::from_u8(200), ParameterType::NotSet);
    }
}
