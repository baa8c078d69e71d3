use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

const UNIX_PREFIX: &str = "unix:";
const TCP_PREFIX: &str = "tcp:";
const WS_SCHEME: &str = "ws://";

/// Where a connection lives.
///
/// Parsed from `unix:/path/to.sock`, `tcp:host:port`, `ws://host:port/path`,
/// or a bare path, which is taken as a Unix socket path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Filesystem-path Unix domain socket.
    Unix(PathBuf),
    /// TCP `host:port`, resolved when binding or connecting.
    Tcp(String),
    /// WebSocket URL. Each text message carries one envelope, so there is
    /// no byte stream to frame; only the async session speaks it.
    WebSocket(String),
}

impl Endpoint {
    /// Transport name for log fields.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Unix(_) => "unix-domain-socket",
            Endpoint::Tcp(_) => "tcp",
            Endpoint::WebSocket(_) => "websocket",
        }
    }

    /// `host:port` of a WebSocket URL, for binding a listener.
    ///
    /// A URL without a port gets port 80.
    pub fn websocket_authority(&self) -> Option<String> {
        let Endpoint::WebSocket(url) = self else {
            return None;
        };
        let rest = url.strip_prefix(WS_SCHEME)?;
        let authority = rest.split('/').next().unwrap_or(rest);
        if authority.rsplit_once(':').is_some_and(|(_, port)| !port.contains(']')) {
            Some(authority.to_string())
        } else {
            Some(format!("{authority}:80"))
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "endpoint must not be empty"));
        }

        if let Some(rest) = trimmed.strip_prefix(WS_SCHEME) {
            let authority = rest.split('/').next().unwrap_or(rest);
            let (host, port) = match authority.rsplit_once(':') {
                Some((host, port)) if !port.contains(']') => (host, Some(port)),
                _ => (authority, None),
            };
            if host.is_empty() {
                return Err(invalid(input, "missing host"));
            }
            if let Some(port) = port {
                port.parse::<u16>()
                    .map_err(|_| invalid(input, "port must be a number between 0 and 65535"))?;
            }
            return Ok(Endpoint::WebSocket(trimmed.to_string()));
        }
        if trimmed.starts_with("wss://") {
            return Err(invalid(input, "TLS WebSocket endpoints are not supported"));
        }

        if let Some(addr) = trimmed.strip_prefix(TCP_PREFIX) {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| invalid(input, "expected tcp:host:port"))?;
            if host.is_empty() {
                return Err(invalid(input, "missing host"));
            }
            port.parse::<u16>()
                .map_err(|_| invalid(input, "port must be a number between 0 and 65535"))?;
            return Ok(Endpoint::Tcp(addr.to_string()));
        }

        let path = trimmed.strip_prefix(UNIX_PREFIX).unwrap_or(trimmed);
        if path.is_empty() {
            return Err(invalid(input, "missing socket path"));
        }
        Ok(Endpoint::Unix(PathBuf::from(path)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "{TCP_PREFIX}{addr}"),
            Endpoint::WebSocket(url) => f.write_str(url),
        }
    }
}

fn invalid(input: &str, reason: &str) -> TransportError {
    TransportError::InvalidEndpoint {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
