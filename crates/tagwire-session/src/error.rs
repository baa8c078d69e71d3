/// Errors that can occur while serving or calling.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] tagwire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] tagwire_frame::FrameError),

    /// Envelope encoding or decoding error.
    #[error("envelope error: {0}")]
    Envelope(#[from] tagwire_dispatch::EnvelopeError),

    /// The remote side closed the connection.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// No matching response arrived in time.
    #[error("no response after {0:?}")]
    Timeout(std::time::Duration),

    /// A dispatch worker panicked.
    #[error("dispatch worker panicked")]
    WorkerPanicked,

    /// WebSocket handshake or protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "async")]
impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                SessionError::Disconnected("websocket closed".to_string())
            }
            WsError::Io(source) => SessionError::Transport(source.into()),
            other => SessionError::WebSocket(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
