use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::Stream;
use crate::tcp::TcpTransport;
#[cfg(unix)]
use crate::uds::UnixDomainSocket;

/// A bound listener for any [`Endpoint`] kind.
pub enum Listener {
    #[cfg(unix)]
    Unix(UnixDomainSocket),
    Tcp(TcpTransport),
}

impl Listener {
    /// Bind to `endpoint`.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Self::Unix(UnixDomainSocket::bind(path)?)),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(TransportError::Unsupported(endpoint.to_string())),
            Endpoint::Tcp(address) => Ok(Self::Tcp(TcpTransport::bind(address)?)),
            Endpoint::WebSocket(url) => Err(TransportError::NotAStream(url.clone())),
        }
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<Stream> {
        match self {
            #[cfg(unix)]
            Self::Unix(socket) => socket.accept(),
            Self::Tcp(socket) => socket.accept(),
        }
    }

    /// The endpoint clients should connect to.
    ///
    /// For TCP listeners bound to port `0` this carries the real port.
    pub fn local_endpoint(&self) -> Endpoint {
        match self {
            #[cfg(unix)]
            Self::Unix(socket) => Endpoint::Unix(socket.path().to_path_buf()),
            Self::Tcp(socket) => Endpoint::Tcp(socket.local_address().to_string()),
        }
    }
}

/// Open a connection to `endpoint` (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<Stream> {
    match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => UnixDomainSocket::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(TransportError::Unsupported(endpoint.to_string())),
        Endpoint::Tcp(address) => TcpTransport::connect(address),
        Endpoint::WebSocket(url) => Err(TransportError::NotAStream(url.clone())),
    }
}
