//! Tag-routed JSON request dispatch over persistent connections.
//!
//! A peer sends `{"n": tag, "p": payload, "s": sequence}`; the handler
//! registered for `tag` decodes `payload` into its own type, runs, and the
//! reply `{"c": status, "e": error, "er": reason, "r": result, "s": sequence}`
//! goes back on the same connection.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix socket and TCP streams
//! - [`frame`]: length-prefixed UTF-8 text frames
//! - [`dispatch`]: envelopes, payload contracts, registry and dispatcher
//! - [`session`]: hosting a dispatcher on a connection, and the client side
//! - [`handlers`]: built-in file, command and system info operations
//! - [`schema`]: optional JSON Schema validation (behind `schema` feature)

use std::sync::Arc;

/// Re-export transport types.
pub mod transport {
    pub use tagwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tagwire_frame::*;
}

/// Re-export dispatch types.
pub mod dispatch {
    pub use tagwire_dispatch::*;
}

/// Re-export session types.
pub mod session {
    pub use tagwire_session::*;
}

/// Re-export the built-in handlers.
pub mod handlers {
    pub use tagwire_handlers::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use tagwire_schema::*;
}

/// A dispatcher serving every built-in operation.
pub fn builtin_dispatcher() -> tagwire_dispatch::Dispatcher {
    let mut registry = tagwire_dispatch::HandlerRegistry::new();
    tagwire_handlers::register_all(&mut registry);
    tagwire_dispatch::Dispatcher::new(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_dispatcher_routes_every_tag() {
        let dispatcher = builtin_dispatcher();
        for tag in tagwire_handlers::TAGS {
            assert!(dispatcher.registry().contains(tag), "{tag} not registered");
        }
    }
}
