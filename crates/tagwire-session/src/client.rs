use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::time::{Duration, Instant};

use serde_json::Value;
use tagwire_dispatch::{decode_response, encode_request, Request, Response, Sequence};
use tagwire_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use tagwire_transport::{Endpoint, Stream};
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// Client behavior configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long [`Client::call`] waits for the matching response.
    pub timeout: Duration,
    /// Framing limits. The read timeout is managed per call.
    pub frame: FrameConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            frame: FrameConfig::default(),
        }
    }
}

/// Issues requests and collects their responses.
///
/// Responses are matched by sequence number. Ones that arrive while waiting
/// for a different sequence are held until asked for; responses to requests
/// that already timed out are discarded.
pub struct Client {
    reader: FrameReader<Stream>,
    writer: FrameWriter<Stream>,
    next_sequence: Sequence,
    pending: HashMap<Sequence, Response>,
    outstanding: HashSet<Sequence>,
    config: ClientConfig,
}

impl Client {
    /// Connect to a listening session.
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        Self::connect_with_config(endpoint, ClientConfig::default())
    }

    /// Connect with explicit configuration.
    pub fn connect_with_config(endpoint: &Endpoint, config: ClientConfig) -> Result<Self> {
        let stream = tagwire_transport::connect(endpoint)?;
        debug!(endpoint = %endpoint, "client connected");
        Self::from_stream(stream, config)
    }

    /// Use an already established stream.
    pub fn from_stream(stream: Stream, config: ClientConfig) -> Result<Self> {
        let reader = FrameReader::for_stream(stream.try_clone()?, config.frame.clone())?;
        let writer = FrameWriter::for_stream(stream, config.frame.clone())?;
        Ok(Self {
            reader,
            writer,
            next_sequence: 1,
            pending: HashMap::new(),
            outstanding: HashSet::new(),
            config,
        })
    }

    /// Send one request and wait for its response.
    pub fn call(&mut self, tag: &str, payload: Value) -> Result<Response> {
        let sequence = self.send(tag, payload)?;
        self.wait_for(sequence)
    }

    /// Send a request under the next sequence number without waiting.
    pub fn send(&mut self, tag: &str, payload: Value) -> Result<Sequence> {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.send_request(&Request::new(tag, payload, sequence))?;
        Ok(sequence)
    }

    /// Send a request with a caller-chosen sequence number.
    pub fn send_request(&mut self, request: &Request) -> Result<()> {
        let encoded = encode_request(request)?;
        self.send_raw(&encoded)?;
        self.outstanding.insert(request.sequence);
        Ok(())
    }

    /// Send arbitrary text as one frame.
    pub fn send_raw(&mut self, text: &str) -> Result<()> {
        self.writer.send_text(text)?;
        Ok(())
    }

    /// Wait for the response carrying `sequence`.
    ///
    /// Fails with [`SessionError::Timeout`] once the configured timeout has
    /// passed without it arriving. The sequence is then abandoned: a late
    /// response to it is dropped instead of held.
    pub fn wait_for(&mut self, sequence: Sequence) -> Result<Response> {
        let result = self.receive(sequence);
        if !matches!(result, Err(SessionError::Disconnected(_))) {
            self.outstanding.remove(&sequence);
        }
        result
    }

    fn receive(&mut self, sequence: Sequence) -> Result<Response> {
        if let Some(response) = self.pending.remove(&sequence) {
            return Ok(response);
        }

        let deadline = Instant::now() + self.config.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::Timeout(self.config.timeout));
            }
            self.reader.get_ref().set_read_timeout(Some(remaining))?;

            let text = match self.reader.read_text() {
                Ok(text) => text,
                Err(FrameError::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Err(SessionError::Timeout(self.config.timeout));
                }
                Err(err) if err.is_disconnect() => {
                    return Err(SessionError::Disconnected(format!(
                        "connection closed while waiting for sequence {sequence}"
                    )));
                }
                Err(err) => return Err(err.into()),
            };

            let response = match decode_response(text.as_bytes()) {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "ignoring undecodable response");
                    continue;
                }
            };

            if response.sequence == sequence {
                return Ok(response);
            }
            if !self.outstanding.contains(&response.sequence) {
                debug!(
                    received = response.sequence,
                    "discarding response nobody is waiting for"
                );
                continue;
            }
            debug!(
                expected = sequence,
                received = response.sequence,
                "holding out-of-order response"
            );
            self.pending.insert(response.sequence, response);
        }
    }

    /// Number of responses received but not yet claimed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("next_sequence", &self.next_sequence)
            .field("pending", &self.pending.len())
            .field("timeout", &self.config.timeout)
            .finish()
    }
}
