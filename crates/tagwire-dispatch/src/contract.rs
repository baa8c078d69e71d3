//! The contract a payload type signs to become routable.
//!
//! A type implementing [`Payload`] names its wire tag once, as an associated
//! constant, and says how to build itself from the untyped `p` value.
//! Registration reads the tag from the type, so the two can never drift
//! apart.
//!
//! The helpers below cover the common shapes and produce uniform
//! [`PayloadError`] detail.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// A typed request payload bound to a wire tag.
pub trait Payload: Sized {
    /// The `n` value routed to this payload's handler.
    const TAG: &'static str;

    /// Build the payload from the request's `p` value.
    ///
    /// Missing optional fields should resolve to documented defaults. Input
    /// that cannot be given a sensible meaning is an error, never a panic.
    fn from_payload(value: &Value) -> Result<Self, PayloadError>;
}

/// Describes a JSON value's type for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode any `Deserialize` type, folding serde's message into
/// [`PayloadError::Invalid`].
pub fn deserialize<T: DeserializeOwned>(value: &Value) -> Result<T, PayloadError> {
    T::deserialize(value).map_err(|err| PayloadError::Invalid(err.to_string()))
}

/// The payload must be a string.
pub fn expect_str(value: &Value) -> Result<String, PayloadError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or(PayloadError::WrongType {
            expected: "a string",
            found: value_kind(value),
        })
}

/// The payload must be an object.
pub fn expect_object(value: &Value) -> Result<&Map<String, Value>, PayloadError> {
    value.as_object().ok_or(PayloadError::WrongType {
        expected: "an object",
        found: value_kind(value),
    })
}

/// A string field with no default. Absent and `null` both count as missing.
pub fn required_str(object: &Map<String, Value>, field: &'static str) -> Result<String, PayloadError> {
    optional_str(object, field)?.ok_or(PayloadError::MissingField(field))
}

/// A string field that may be absent or `null`.
pub fn optional_str(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, PayloadError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(field_type(field, "a string", other)),
    }
}

/// A boolean field, `default` when absent or `null`.
pub fn optional_bool(
    object: &Map<String, Value>,
    field: &'static str,
    default: bool,
) -> Result<bool, PayloadError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(field_type(field, "a boolean", other)),
    }
}

/// An array-of-strings field, empty when absent or `null`.
pub fn string_array(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, PayloadError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| field_type(field, "an array of strings", item))
            })
            .collect(),
        Some(other) => Err(field_type(field, "an array of strings", other)),
    }
}

fn field_type(field: &'static str, expected: &'static str, found: &Value) -> PayloadError {
    PayloadError::FieldType {
        field,
        expected,
        found: value_kind(found),
    }
}
