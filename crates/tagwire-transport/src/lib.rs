//! Byte-stream transports for tagwire connections.
//!
//! A tagwire connection is one persistent, ordered byte stream. This crate
//! opens those streams:
//! - Unix domain sockets (Linux/macOS)
//! - TCP
//!
//! WebSocket URLs parse into an [`Endpoint`] too, but carry whole messages;
//! the async session in `tagwire-session` serves them.
//!
//! It knows nothing about frames or envelopes. Everything else builds on
//! the [`Stream`] and [`Listener`] types provided here.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::{connect, Listener};
pub use stream::Stream;
pub use tcp::TcpTransport;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
