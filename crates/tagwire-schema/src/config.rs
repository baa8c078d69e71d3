/// Limits and strictness for a [`SchemaRegistry`](crate::SchemaRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Reject payloads for tags that have no schema instead of passing them.
    pub fail_on_missing_schema: bool,
    /// Upper bound on `<tag>.schema.json` files read from one directory.
    pub max_schemas_from_directory: usize,
    /// Upper bound on the size of a single schema file, in bytes.
    pub max_schema_file_size: usize,
}

impl RegistryConfig {
    /// Every tag must have a schema.
    pub fn strict() -> Self {
        Self {
            fail_on_missing_schema: true,
            ..Self::default()
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            fail_on_missing_schema: false,
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
        }
    }
}
