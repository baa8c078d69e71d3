//! Optional JSON Schema validation of request payloads.
//!
//! Schemas are keyed by request tag. A dispatcher with a registry attached
//! checks each payload against its tag's schema before the handler's own
//! decoding runs, so contract violations surface with schema-level detail.

pub mod config;
pub mod error;
pub mod registry;
mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
