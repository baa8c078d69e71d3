use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::contract::Payload;
use crate::envelope::{Response, Sequence};

/// A type-erased handler: raw payload in, response out.
///
/// Produced by [`HandlerRegistry::register`], which bakes the payload's
/// decode step into the closure.
pub type Handler = Arc<dyn Fn(Sequence, &Value) -> Response + Send + Sync>;

/// Tag-keyed table of handlers.
///
/// Fill it during startup, then share it read-only (usually behind an
/// `Arc`) with every [`Dispatcher`](crate::Dispatcher) that serves requests.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under the tag of its payload type `P`.
    ///
    /// The stored adapter decodes the raw payload with `P::from_payload`
    /// and calls `handler` on success. On failure it answers 400
    /// "Payload conversion failed" with the decode detail, keeping the
    /// request's sequence. A second registration for the same tag replaces
    /// the first.
    pub fn register<P, F>(&mut self, handler: F) -> &mut Self
    where
        P: Payload + 'static,
        F: Fn(Sequence, P) -> Response + Send + Sync + 'static,
    {
        let adapter: Handler = Arc::new(move |sequence: Sequence, payload: &Value| {
            match P::from_payload(payload) {
                Ok(typed) => handler(sequence, typed),
                Err(err) => {
                    debug!(tag = P::TAG, sequence, error = %err, "payload conversion failed");
                    Response::payload_conversion_failed(sequence, err)
                }
            }
        });

        if self.handlers.insert(P::TAG.to_string(), adapter).is_some() {
            debug!(tag = P::TAG, "replaced existing handler");
        } else {
            debug!(tag = P::TAG, "registered handler");
        }
        self
    }

    /// The handler registered for `tag`, if any.
    pub fn lookup(&self, tag: &str) -> Option<&Handler> {
        self.handlers.get(tag)
    }

    /// Check if a tag has a handler.
    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::contract::expect_str;
    use crate::error::PayloadError;

    struct Shout(String);

    impl Payload for Shout {
        const TAG: &'static str = "shout";

        fn from_payload(value: &Value) -> Result<Self, PayloadError> {
            expect_str(value).map(Shout)
        }
    }

    struct Ping;

    impl Payload for Ping {
        const TAG: &'static str = "ping";

        fn from_payload(_value: &Value) -> Result<Self, PayloadError> {
            Ok(Ping)
        }
    }

    fn shout(sequence: Sequence, payload: Shout) -> Response {
        Response::ok(sequence, json!(payload.0.to_uppercase()))
    }

    #[test]
    fn tag_comes_from_payload_type() {
        let mut registry = HandlerRegistry::new();
        registry.register(shout);

        assert!(registry.contains("shout"));
        assert_eq!(registry.tags(), vec!["shout"]);
    }

    #[test]
    fn adapter_decodes_and_invokes() {
        let mut registry = HandlerRegistry::new();
        registry.register(shout);

        let handler = registry.lookup("shout").unwrap();
        let response = handler(9, &json!("hey"));
        assert_eq!(response.result, json!("HEY"));
        assert_eq!(response.sequence, 9);
    }

    #[test]
    fn adapter_turns_decode_failure_into_400() {
        let mut registry = HandlerRegistry::new();
        registry.register(shout);

        let handler = registry.lookup("shout").unwrap();
        let response = handler(4, &json!({"not": "a string"}));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.error, "Payload conversion failed");
        assert_eq!(response.error_reason, "expected a string, found an object");
        assert_eq!(response.sequence, 4);
        assert_eq!(response.result, Value::Null);
    }

    #[test]
    fn later_registration_wins() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(|sequence, _: Ping| Response::ok(sequence, json!("first")))
            .register(|sequence, _: Ping| Response::ok(sequence, json!("second")));

        assert_eq!(registry.len(), 1);
        let response = registry.lookup("ping").unwrap()(1, &Value::Null);
        assert_eq!(response.result, json!("second"));
    }

    #[test]
    fn unknown_tag_is_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup("ping").is_none());
    }

    #[test]
    fn debug_lists_tags() {
        let mut registry = HandlerRegistry::new();
        registry.register(shout).register(|s, _: Ping| Response::new(s));
        assert_eq!(
            format!("{registry:?}"),
            r#"HandlerRegistry { tags: ["ping", "shout"] }"#
        );
    }
}
