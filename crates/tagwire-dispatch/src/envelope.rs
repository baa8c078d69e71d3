use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::value_kind;
use crate::error::{EnvelopeError, Result};
use crate::status;

/// Caller-assigned correlation number, echoed back unchanged.
///
/// Nothing here checks that sequences are unique among in-flight requests;
/// that is the caller's business.
pub type Sequence = i64;

/// An inbound call: `{"n": tag, "p": payload, "s": sequence}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Tag selecting the handler (`n`).
    pub function_name: String,
    /// Untyped payload (`p`), decoded by the handler's contract.
    pub payload: Value,
    /// Correlation number (`s`).
    pub sequence: Sequence,
}

impl Request {
    pub fn new(function_name: impl Into<String>, payload: Value, sequence: Sequence) -> Self {
        Self {
            function_name: function_name.into(),
            payload,
            sequence,
        }
    }

    /// Map a JSON object onto a request.
    ///
    /// Missing or mistyped fields fall back to defaults: an empty tag, a
    /// `null` payload, sequence `0`. Only a non-object top level is an error.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| EnvelopeError::NotAnObject(value_kind(value)))?;
        Ok(Self::from_object(object))
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            function_name: object
                .get("n")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            payload: object.get("p").cloned().unwrap_or(Value::Null),
            sequence: object.get("s").map(sequence_from).unwrap_or(0),
        }
    }

    /// The wire form of this request.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "n": self.function_name,
            "p": self.payload,
            "s": self.sequence,
        })
    }
}

/// The reply to one [`Request`].
///
/// Serializes as `{"c", "e", "er", "r", "s"}` in that order. `e` and `er` are
/// omitted when empty; `r` is always present and is `null` on failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Status code (`c`), 200 unless something went wrong.
    #[serde(rename = "c", default = "default_status")]
    pub status_code: i32,
    /// Short error category (`e`).
    #[serde(rename = "e", default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Error detail (`er`).
    #[serde(rename = "er", default, skip_serializing_if = "String::is_empty")]
    pub error_reason: String,
    /// Handler result (`r`).
    #[serde(rename = "r", default)]
    pub result: Value,
    /// Sequence of the request this answers (`s`).
    #[serde(rename = "s", default)]
    pub sequence: Sequence,
}

fn default_status() -> i32 {
    status::OK
}

impl Response {
    /// An empty 200 response with a `null` result.
    pub fn new(sequence: Sequence) -> Self {
        Self {
            status_code: status::OK,
            error: String::new(),
            error_reason: String::new(),
            result: Value::Null,
            sequence,
        }
    }

    /// A 200 response carrying `result`.
    pub fn ok(sequence: Sequence, result: Value) -> Self {
        Self {
            result,
            ..Self::new(sequence)
        }
    }

    /// A 200 response carrying `result` serialized to JSON.
    ///
    /// If `result` cannot be serialized the response is a 500 instead.
    pub fn success<T: Serialize>(sequence: Sequence, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self::ok(sequence, value),
            Err(err) => Self::failure(
                sequence,
                status::INTERNAL_ERROR,
                "Result serialization failed",
                err,
            ),
        }
    }

    /// A failure response; the result stays `null`.
    pub fn failure(
        sequence: Sequence,
        status_code: i32,
        error: impl Into<String>,
        error_reason: impl Display,
    ) -> Self {
        Self {
            status_code,
            error: error.into(),
            error_reason: error_reason.to_string(),
            ..Self::new(sequence)
        }
    }

    /// The 400 response for a payload its contract rejected.
    pub fn payload_conversion_failed(sequence: Sequence, reason: impl Display) -> Self {
        Self::failure(
            sequence,
            status::BAD_REQUEST,
            status::PAYLOAD_CONVERSION_FAILED,
            reason,
        )
    }

    /// The 404 response for a tag with no handler.
    pub fn function_not_found(sequence: Sequence, tag: &str) -> Self {
        Self::failure(
            sequence,
            status::NOT_FOUND,
            status::FUNCTION_NOT_FOUND,
            format_args!("No callback registered for function: {tag}"),
        )
    }

    /// True when the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        status::is_success(self.status_code)
    }
}

/// Decode wire bytes into a [`Request`].
///
/// Fails when the bytes are not JSON or the top level is not an object. No
/// sequence can be recovered in either case, so the message cannot be
/// answered.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let value: Value = serde_json::from_slice(bytes).map_err(EnvelopeError::Malformed)?;
    Request::from_value(&value)
}

/// Encode a [`Response`] as compact JSON.
pub fn encode_response(response: &Response) -> Result<String> {
    serde_json::to_string(response).map_err(EnvelopeError::Encode)
}

/// Encode a [`Request`] as compact JSON.
pub fn encode_request(request: &Request) -> Result<String> {
    serde_json::to_string(&request.to_value()).map_err(EnvelopeError::Encode)
}

/// Decode wire bytes into a [`Response`], with the same defaults as encoding.
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let value: Value = serde_json::from_slice(bytes).map_err(EnvelopeError::Malformed)?;
    if !value.is_object() {
        return Err(EnvelopeError::NotAnObject(value_kind(&value)));
    }
    serde_json::from_value(value).map_err(EnvelopeError::Malformed)
}

fn sequence_from(value: &Value) -> Sequence {
    if let Some(n) = value.as_i64() {
        return n;
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => f as i64,
        _ => 0,
    }
}
