use tagwire_dispatch::Dispatcher;
use tagwire_transport::Endpoint;
use tracing::info;

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Dial out to `endpoint` and serve requests arriving on that connection.
///
/// This is the agent side of a controller/agent pair: the agent opens the
/// connection, the controller sends the requests.
pub fn connect(endpoint: &Endpoint, dispatcher: Dispatcher) -> Result<Session> {
    connect_with_config(endpoint, dispatcher, SessionConfig::default())
}

/// Dial out with explicit session configuration.
pub fn connect_with_config(
    endpoint: &Endpoint,
    dispatcher: Dispatcher,
    config: SessionConfig,
) -> Result<Session> {
    let stream = tagwire_transport::connect(endpoint)?;
    info!(endpoint = %endpoint, transport = endpoint.transport_name(), "connected to controller");
    Session::from_stream(endpoint.to_string(), stream, dispatcher, config)
}
