use std::sync::atomic::{AtomicU64, Ordering};

use tagwire_dispatch::Dispatcher;
use tagwire_transport::{Endpoint, Listener};
use tracing::{debug, info};

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Listens for connections and turns each into a [`Session`].
pub struct SessionListener {
    listener: Listener,
    dispatcher: Dispatcher,
    config: SessionConfig,
    next_session_id: AtomicU64,
}

impl SessionListener {
    /// Bind to `endpoint`.
    pub fn bind(endpoint: &Endpoint, dispatcher: Dispatcher) -> Result<Self> {
        let listener = Listener::bind(endpoint)?;
        let endpoint = listener.local_endpoint();
        info!(endpoint = %endpoint, transport = endpoint.transport_name(), "listening");
        Ok(Self {
            listener,
            dispatcher,
            config: SessionConfig::default(),
            next_session_id: AtomicU64::new(1),
        })
    }

    /// Override the configuration given to accepted sessions.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept the next connection and assign an auto-generated session id.
    pub fn accept(&self) -> Result<Session> {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.accept_with_id(&format!("session-{id}"))
    }

    /// Accept the next connection and use an explicit session id.
    pub fn accept_with_id(&self, session_id: &str) -> Result<Session> {
        let stream = self.listener.accept()?;
        debug!(session = session_id, peer = %stream.peer_label(), "accepted connection");
        Session::from_stream(
            session_id,
            stream,
            self.dispatcher.clone(),
            self.config.clone(),
        )
    }

    /// The endpoint clients should connect to.
    pub fn local_endpoint(&self) -> Endpoint {
        self.listener.local_endpoint()
    }
}

impl std::fmt::Debug for SessionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionListener")
            .field("endpoint", &self.local_endpoint().to_string())
            .field("config", &self.config)
            .finish()
    }
}
