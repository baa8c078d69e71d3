//! Connection hosting for tagwire.
//!
//! A [`Session`] owns one live connection and feeds every text frame it
//! receives through a [`Dispatcher`](tagwire_dispatch::Dispatcher), writing
//! each response back on the same connection. Sessions are obtained by
//! listening ([`SessionListener`]) or by dialing out ([`connect`]), which is
//! how an agent attaches to a controller that then issues requests.
//!
//! [`Client`] is the other end: it sends requests and matches responses to
//! them by sequence number, in whatever order they arrive.
//!
//! With the `async` feature, sessions also run on tokio, including over
//! WebSocket (`ws://`), where each text message is one envelope.

pub mod client;
pub mod connector;
pub mod error;
pub mod listener;
pub mod session;

#[cfg(feature = "async")]
pub mod async_session;
#[cfg(feature = "async")]
pub mod websocket;

pub use client::{Client, ClientConfig};
pub use connector::{connect, connect_with_config};
pub use error::{Result, SessionError};
pub use listener::SessionListener;
pub use session::{ServeStats, Session, SessionConfig};

#[cfg(feature = "async")]
pub use async_session::{serve_async, serve_endpoint_async};
#[cfg(feature = "async")]
pub use websocket::{call_websocket, connect_websocket, serve_websocket, serve_websocket_endpoint};
