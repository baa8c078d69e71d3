use std::net::{TcpListener, TcpStream};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::Stream;

/// TCP listener.
pub struct TcpTransport {
    listener: TcpListener,
    address: String,
}

impl TcpTransport {
    /// Bind and listen on `host:port`. Port `0` picks a free port.
    pub fn bind(address: &str) -> Result<Self> {
        let listener = TcpListener::bind(address).map_err(|source| TransportError::Bind {
            address: address.to_string(),
            source,
        })?;
        let address = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| address.to_string());

        info!(%address, "listening on tcp");
        Ok(Self { listener, address })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Stream> {
        let (stream, addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%addr, "accepted tcp connection");
        Ok(Stream::from_tcp(stream))
    }

    /// Connect to `host:port` (blocking).
    pub fn connect(address: &str) -> Result<Stream> {
        let stream = TcpStream::connect(address).map_err(|source| TransportError::Connect {
            address: address.to_string(),
            source,
        })?;
        debug!(%address, "connected over tcp");
        Ok(Stream::from_tcp(stream))
    }

    /// The resolved local address, e.g. `127.0.0.1:40123`.
    pub fn local_address(&self) -> &str {
        &self.address
    }
}
