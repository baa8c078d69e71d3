/// Errors from encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The message is not valid JSON.
    #[error("message is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The message is valid JSON but its top level is not an object.
    #[error("message top level is {0}, expected an object")]
    NotAnObject(&'static str),

    /// A record could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Why a payload could not be converted to a handler's type.
///
/// The `Display` text becomes the `er` field of the 400 response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The payload as a whole has the wrong JSON type.
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    /// A field with no default is absent or null.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A field is present with the wrong JSON type.
    #[error("field '{field}' must be {expected}, found {found}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// The payload has the right shape but an unacceptable value.
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
