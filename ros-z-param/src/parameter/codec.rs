//! Conversion between parameter values and operator-editable text.
//!
//! Display text is what an operator sees and types back in: scalars in their
//! natural form, arrays as `[e0,e1,...]`. Encoding always targets the kind of
//! the parameter's current value, so the remote type is never changed by an
//! edit.

use std::fmt::Display;

use strum::{Display as StrumDisplay, EnumString};

use super::overlay::PendingValue;
use super::types::{ParameterType, ParameterValue};
use crate::error::CodecError;

/// Rendered for values whose type byte is unknown or unset.
pub const INVALID_TYPE_TEXT: &str = "error, invalid type...";
/// Rendered for a parameter whose value was never fetched.
pub const UNDEFINED_TEXT: &str = "undefined";

/// How scalar text that does not parse is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CoercionMode {
    /// Reject text that is not a well-formed value of the target kind.
    #[default]
    Strict,
    /// Never fail: unparsable numbers become 0 and anything other than
    /// `true` becomes `false`.
    Lenient,
}

/// Render a value for display. Never fails.
pub fn decode_for_display(value: Option<&ParameterValue>) -> String {
    let Some(value) = value else {
        return UNDEFINED_TEXT.to_string();
    };
    match value {
        ParameterValue::Bool(v) => v.to_string(),
        ParameterValue::Integer(v) => v.to_string(),
        ParameterValue::Double(v) => v.to_string(),
        ParameterValue::String(v) => v.clone(),
        ParameterValue::ByteArray(v) => join(v),
        ParameterValue::BoolArray(v) => join(v),
        ParameterValue::IntegerArray(v) => join(v),
        ParameterValue::DoubleArray(v) => join(v),
        ParameterValue::StringArray(v) => join(v),
        ParameterValue::NotSet | ParameterValue::Invalid(_) => INVALID_TYPE_TEXT.to_string(),
    }
}

fn join<T: Display>(items: &[T]) -> String {
    let body = items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("[{body}]")
}

/// Build a new value of the same kind as `current` from operator text.
///
/// Empty text means "leave this parameter alone" and yields
/// [`PendingValue::Cleared`].
pub fn encode_from_text(
    current: &ParameterValue,
    text: &str,
    mode: CoercionMode,
) -> Result<PendingValue, CodecError> {
    if text.is_empty() {
        return Ok(PendingValue::Cleared);
    }

    let value = match current.parameter_type() {
        ParameterType::NotSet => return Err(CodecError::UntypedTarget),
        ParameterType::Bool => ParameterValue::Bool(parse_bool(text, mode)?),
        ParameterType::Integer => ParameterValue::Integer(parse_integer(text, mode)?),
        ParameterType::Double => ParameterValue::Double(parse_double(text, mode)?),
        ParameterType::String => ParameterValue::String(text.to_string()),
        ParameterType::ByteArray => ParameterValue::ByteArray(parse_bytes(text)?),
        ParameterType::BoolArray => ParameterValue::BoolArray(
            split_array(text)
                .iter()
                .map(|item| parse_bool(item, mode))
                .collect::<Result<_, _>>()?,
        ),
        ParameterType::IntegerArray => ParameterValue::IntegerArray(
            split_array(text)
                .iter()
                .map(|item| parse_integer(item, mode))
                .collect::<Result<_, _>>()?,
        ),
        ParameterType::DoubleArray => ParameterValue::DoubleArray(
            split_array(text)
                .iter()
                .map(|item| parse_double(item, mode))
                .collect::<Result<_, _>>()?,
        ),
        ParameterType::StringArray => ParameterValue::StringArray(split_array(text)),
    };
    Ok(PendingValue::Set(value))
}

/// Split array text into its elements.
///
/// All whitespace is removed first, then one leading `[` and one trailing `]`.
/// `[]` is the empty array.
pub fn split_array(text: &str) -> Vec<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let body = compact.strip_prefix('[').unwrap_or(&compact);
    let body = body.strip_suffix(']').unwrap_or(body);
    if body.is_empty() {
        return Vec::new();
    }
    body.split(',').map(str::to_string).collect()
}

fn parse_bool(text: &str, mode: CoercionMode) -> Result<bool, CodecError> {
    let normalized = text.trim().to_lowercase();
    match mode {
        CoercionMode::Lenient => Ok(normalized == "true"),
        CoercionMode::Strict => match normalized.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(invalid(ParameterType::Bool, text)),
        },
    }
}

fn parse_integer(text: &str, mode: CoercionMode) -> Result<i64, CodecError> {
    let trimmed = text.trim();
    match mode {
        CoercionMode::Strict => trimmed
            .parse::<i64>()
            .map_err(|_| invalid(ParameterType::Integer, text)),
        CoercionMode::Lenient => {
            if let Ok(v) = trimmed.parse::<i64>() {
                return Ok(v);
            }
            let number = lenient_number(trimmed);
            // `as` saturates at the i64 bounds and truncates toward zero.
            Ok(if number.is_finite() { number as i64 } else { 0 })
        }
    }
}

fn parse_double(text: &str, mode: CoercionMode) -> Result<f64, CodecError> {
    let trimmed = text.trim();
    match mode {
        CoercionMode::Strict => trimmed
            .parse::<f64>()
            .map_err(|_| invalid(ParameterType::Double, text)),
        CoercionMode::Lenient => Ok(lenient_number(trimmed)),
    }
}

/// Numeric coercion that never fails: empty or unparsable text is 0.
/// Accepts decimal floats and `0x`, `0o`, `0b` prefixed integers.
fn lenient_number(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let radix = match text.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let parsed = match radix {
        Some(radix) => radix_number(&text[2..], radix),
        None => text.parse::<f64>().ok(),
    };
    match parsed {
        Some(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}

/// Prefixed literals of any length; values past `u64` keep growing as floats.
fn radix_number(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
    })
}

fn parse_bytes(text: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(digits) = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
    {
        return hex::decode(digits).map_err(|_| CodecError::InvalidBytes(text.to_string()));
    }
    split_array(&compact)
        .iter()
        .map(|item| item.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| CodecError::InvalidBytes(text.to_string()))
}

fn invalid(kind: ParameterType, text: &str) -> CodecError {
    CodecError::InvalidScalar {
        kind,
        text: text.to_string(),
    }
}
