/// Errors from loading schemas or validating payloads.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// A schema could not be compiled.
    #[error("failed to compile schema for '{tag}': {message}")]
    CompileFailed { tag: String, message: String },

    /// A schema document is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The payload violates its tag's schema.
    #[error("schema validation failed for '{tag}': {message}")]
    ValidationFailed { tag: String, message: String },

    /// No schema is registered for the tag.
    #[error("no schema registered for '{0}'")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
