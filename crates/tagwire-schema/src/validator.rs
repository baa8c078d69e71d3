use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Errors listed in one failure message, beyond the first.
const EXTRA_ERRORS: usize = 3;

pub(crate) fn validate_value(tag: &str, value: &Value, validator: &Validator) -> Result<()> {
    let mut errors = validator.iter_errors(value);
    let Some(first) = errors.next() else {
        return Ok(());
    };

    let mut message = first.to_string();
    for err in errors.take(EXTRA_ERRORS) {
        message.push_str("; ");
        message.push_str(&err.to_string());
    }
    Err(SchemaError::ValidationFailed {
        tag: tag.to_string(),
        message,
    })
}
