//! Tag-routed request dispatch.
//!
//! Every inbound message is a [`Request`] envelope `{"n": tag, "p": payload,
//! "s": sequence}`. The [`Dispatcher`] looks the tag up in a
//! [`HandlerRegistry`], decodes the payload into the handler's own type via
//! its [`Payload`] contract, runs the handler and hands back a [`Response`]
//! carrying the same sequence number.
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::{json, Value};
//! use tagwire_dispatch::{
//!     Dispatcher, HandlerRegistry, Payload, PayloadError, Request, Response, Sequence,
//! };
//!
//! struct Echo(String);
//!
//! impl Payload for Echo {
//!     const TAG: &'static str = "echo";
//!
//!     fn from_payload(value: &Value) -> Result<Self, PayloadError> {
//!         tagwire_dispatch::contract::expect_str(value).map(Echo)
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(|sequence: Sequence, echo: Echo| Response::ok(sequence, json!(echo.0)));
//!
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//! let response = dispatcher.handle(Request::new("echo", json!("hi"), 4));
//! assert_eq!(response.result, json!("hi"));
//! assert_eq!(response.sequence, 4);
//! ```

pub mod contract;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod status;

pub use contract::Payload;
pub use dispatcher::Dispatcher;
pub use envelope::{
    decode_request, decode_response, encode_request, encode_response, Request, Response,
    Sequence,
};
pub use error::{EnvelopeError, PayloadError, Result};
pub use registry::{Handler, HandlerRegistry};
