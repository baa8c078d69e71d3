use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::envelope::{decode_request, encode_response, Request, Response};
use crate::registry::HandlerRegistry;

/// Runs one request-to-response cycle at a time.
///
/// Holds nothing but read-only handles, so clones are cheap and may be
/// moved onto worker threads freely.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    #[cfg(feature = "schema")]
    schemas: Option<Arc<tagwire_schema::SchemaRegistry>>,
}

impl Dispatcher {
    /// Create a dispatcher over a populated registry.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            #[cfg(feature = "schema")]
            schemas: None,
        }
    }

    /// Validate payloads against per-tag JSON Schemas before decoding them.
    ///
    /// A violation is answered like any other payload conversion failure.
    #[cfg(feature = "schema")]
    pub fn with_schemas(mut self, schemas: Arc<tagwire_schema::SchemaRegistry>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// The registry requests are routed through.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Route `request` to its handler and return the handler's response.
    ///
    /// An unknown tag gets a 404 built here; nothing is invoked.
    pub fn handle(&self, request: Request) -> Response {
        let Request {
            function_name,
            payload,
            sequence,
        } = request;

        let Some(handler) = self.registry.lookup(&function_name) else {
            debug!(tag = %function_name, sequence, "no handler registered");
            return Response::function_not_found(sequence, &function_name);
        };

        #[cfg(feature = "schema")]
        if let Some(schemas) = &self.schemas {
            if let Err(err) = schemas.validate(&function_name, &payload) {
                debug!(tag = %function_name, sequence, error = %err, "payload rejected by schema");
                return Response::payload_conversion_failed(sequence, err);
            }
        }

        let response = handler(sequence, &payload);
        debug!(
            tag = %function_name,
            sequence,
            status = response.status_code,
            "dispatched request"
        );
        response
    }

    /// Decode one inbound text message, dispatch it and encode the reply.
    ///
    /// Returns `None` when the message is dropped: it was not a JSON object,
    /// so there is no sequence to answer to.
    pub fn handle_text(&self, text: &str) -> Option<String> {
        let request = match decode_request(text.as_bytes()) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, len = text.len(), "dropping undecodable message");
                return None;
            }
        };

        let response = self.handle(request);
        match encode_response(&response) {
            Ok(encoded) => Some(encoded),
            Err(err) => {
                error!(sequence = response.sequence, error = %err, "failed to encode response");
                None
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{json, Value};

    use super::*;
    use crate::contract::{expect_object, expect_str, optional_bool, required_str, Payload};
    use crate::envelope::Sequence;
    use crate::error::PayloadError;

    struct ReadPath(String);

    impl Payload for ReadPath {
        const TAG: &'static str = "rf";

        fn from_payload(value: &Value) -> Result<Self, PayloadError> {
            expect_str(value).map(ReadPath)
        }
    }

    struct Store {
        key: String,
        overwrite: bool,
    }

    impl Payload for Store {
        const TAG: &'static str = "store";

        fn from_payload(value: &Value) -> Result<Self, PayloadError> {
            let object = expect_object(value)?;
            Ok(Store {
                key: required_str(object, "key")?,
                overwrite: optional_bool(object, "overwrite", false)?,
            })
        }
    }

    fn read_missing(sequence: Sequence, payload: ReadPath) -> Response {
        Response::failure(
            sequence,
            500,
            "File read error",
            format!("Cannot read file: {}", payload.0),
        )
    }

    fn store(sequence: Sequence, payload: Store) -> Response {
        Response::ok(
            sequence,
            json!({"key": payload.key, "overwrite": payload.overwrite}),
        )
    }

    fn dispatcher(build: impl FnOnce(&mut HandlerRegistry)) -> Dispatcher {
        let mut registry = HandlerRegistry::new();
        build(&mut registry);
        Dispatcher::new(Arc::new(registry))
    }

    #[test]
    fn routes_by_tag_and_keeps_sequence() {
        let dispatcher = dispatcher(|r| {
            r.register(store).register(read_missing);
        });

        for sequence in [0, 1, 77, -5, i64::MAX] {
            let response =
                dispatcher.handle(Request::new("store", json!({"key": "k"}), sequence));
            assert_eq!(response.status_code, 200);
            assert_eq!(response.result, json!({"key": "k", "overwrite": false}));
            assert_eq!(response.sequence, sequence);
        }
    }

    #[test]
    fn unknown_tag_is_404_whatever_the_payload() {
        let dispatcher = dispatcher(|r| {
            r.register(store);
        });

        for payload in [Value::Null, json!("x"), json!([1, 2]), json!({"key": "k"})] {
            let response = dispatcher.handle(Request::new("nope", payload, 12));
            assert_eq!(response.status_code, 404);
            assert_eq!(response.error, "Function not found");
            assert_eq!(response.error_reason, "No callback registered for function: nope");
            assert_eq!(response.sequence, 12);
        }
    }

    #[test]
    fn undecodable_payload_is_400() {
        let dispatcher = dispatcher(|r| {
            r.register(store);
        });

        let response = dispatcher.handle(Request::new("store", json!({"overwrite": true}), 6));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.error, "Payload conversion failed");
        assert_eq!(response.error_reason, "missing required field 'key'");
        assert_eq!(response.sequence, 6);
    }

    #[test]
    fn handler_failure_is_forwarded_unmodified() {
        let dispatcher = dispatcher(|r| {
            r.register(read_missing);
        });

        let encoded = dispatcher
            .handle_text(r#"{"n":"rf","p":"/tmp/x.txt","s":7}"#)
            .unwrap();
        assert_eq!(
            encoded,
            r#"{"c":500,"e":"File read error","er":"Cannot read file: /tmp/x.txt","r":null,"s":7}"#
        );
    }

    #[test]
    fn empty_registry_answers_404() {
        let dispatcher = dispatcher(|_| {});
        let encoded = dispatcher
            .handle_text(r#"{"n":"unknown","p":null,"s":3}"#)
            .unwrap();
        assert_eq!(
            encoded,
            r#"{"c":404,"e":"Function not found","er":"No callback registered for function: unknown","r":null,"s":3}"#
        );
    }

    #[test]
    fn malformed_text_is_dropped() {
        let dispatcher = dispatcher(|r| {
            r.register(store);
        });
        assert_eq!(dispatcher.handle_text("{not json"), None);
        assert_eq!(dispatcher.handle_text("[]"), None);
        assert_eq!(dispatcher.handle_text(""), None);
    }

    #[test]
    fn reregistration_invokes_only_latest_handler() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&first_calls);
        let second = Arc::clone(&second_calls);
        let dispatcher = dispatcher(move |r| {
            r.register(move |sequence, _: ReadPath| {
                first.fetch_add(1, Ordering::SeqCst);
                Response::new(sequence)
            });
            r.register(move |sequence, _: ReadPath| {
                second.fetch_add(1, Ordering::SeqCst);
                Response::new(sequence)
            });
        });

        dispatcher.handle(Request::new("rf", json!("/a"), 1));
        dispatcher.handle(Request::new("rf", json!("/b"), 2));
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clones_share_registry_across_threads() {
        let dispatcher = dispatcher(|r| {
            r.register(store);
        });

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| {
                            let sequence = worker * 100 + i;
                            let response = dispatcher
                                .handle(Request::new("store", json!({"key": "k"}), sequence));
                            (sequence, response.sequence)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for (sent, echoed) in handle.join().unwrap() {
                assert_eq!(sent, echoed);
            }
        }
    }

    #[cfg(feature = "schema")]
    #[test]
    fn schema_violation_is_400_before_decode() {
        let schemas = tagwire_schema::SchemaRegistry::from_embedded(&[(
            "store",
            r#"{"type":"object","properties":{"key":{"type":"string","maxLength":3}}}"#,
        )])
        .unwrap();
        let dispatcher = dispatcher(|r| {
            r.register(store);
        })
        .with_schemas(Arc::new(schemas));

        let response = dispatcher.handle(Request::new("store", json!({"key": "toolong"}), 2));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.error, "Payload conversion failed");
        assert!(response.error_reason.starts_with("schema validation failed for 'store'"));

        let response = dispatcher.handle(Request::new("store", json!({"key": "ok"}), 3));
        assert_eq!(response.status_code, 200);
    }
}
