use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use tagwire_dispatch::Dispatcher;
use tagwire_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use tagwire_transport::Stream;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, SessionError};

/// Session behavior configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Dispatch threads. `1` handles each frame inline before reading the
    /// next; more runs a worker pool and a dedicated writer.
    pub workers: usize,
    /// Stop reading after this many frames, then drain and return.
    pub max_requests: Option<u64>,
    /// Framing limits and socket timeouts.
    pub frame: FrameConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            max_requests: None,
            frame: FrameConfig::default(),
        }
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Frames read off the connection.
    pub received: u64,
    /// Responses written back.
    pub answered: u64,
    /// Frames that produced no response.
    pub dropped: u64,
}

/// One live connection bound to a dispatcher.
pub struct Session {
    id: String,
    peer: String,
    reader: FrameReader<Stream>,
    writer: FrameWriter<Stream>,
    dispatcher: Dispatcher,
    config: SessionConfig,
}

impl Session {
    /// Wrap an established stream.
    pub fn from_stream(
        id: impl Into<String>,
        stream: Stream,
        dispatcher: Dispatcher,
        config: SessionConfig,
    ) -> Result<Self> {
        let peer = stream.peer_label();
        let reader_stream = stream.try_clone()?;
        let reader = FrameReader::for_stream(reader_stream, config.frame.clone())?;
        let writer = FrameWriter::for_stream(stream, config.frame.clone())?;

        Ok(Self {
            id: id.into(),
            peer,
            reader,
            writer,
            dispatcher,
            config,
        })
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Description of the remote side.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A second handle on the connection.
    ///
    /// Calling [`Stream::shutdown`] on it makes a running [`serve`](Self::serve)
    /// return as if the peer had disconnected.
    pub fn shutdown_handle(&self) -> Result<Stream> {
        Ok(self.writer.get_ref().try_clone()?)
    }

    /// Answer requests until the peer disconnects or `max_requests` is hit.
    ///
    /// A frame that fails to decode as a request is dropped and the session
    /// carries on. A framing error ends the session with that error.
    pub fn serve(&mut self) -> Result<ServeStats> {
        let workers = self.config.workers.max(1);
        info!(
            session = %self.id,
            peer = %self.peer,
            workers,
            "serving session"
        );

        let stats = if workers == 1 {
            self.serve_inline()?
        } else {
            self.serve_threaded(workers)?
        };

        info!(
            session = %self.id,
            received = stats.received,
            answered = stats.answered,
            dropped = stats.dropped,
            "session ended"
        );
        Ok(stats)
    }

    fn serve_inline(&mut self) -> Result<ServeStats> {
        let mut stats = ServeStats::default();

        while !limit_reached(self.config.max_requests, stats.received) {
            let Some(text) = next_frame(&mut self.reader, &self.id)? else {
                break;
            };
            stats.received += 1;
            trace!(session = %self.id, message = %text, "received message");

            match self.dispatcher.handle_text(&text) {
                Some(encoded) => {
                    trace!(session = %self.id, message = %encoded, "sending response");
                    match self.writer.send_text(&encoded) {
                        Ok(()) => stats.answered += 1,
                        Err(err) if err.is_disconnect() => {
                            warn!(session = %self.id, error = %err, "peer went away before response was sent");
                            break;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                None => stats.dropped += 1,
            }
        }

        Ok(stats)
    }

    fn serve_threaded(&mut self, workers: usize) -> Result<ServeStats> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<String>();
        let (out_tx, out_rx) = crossbeam_channel::unbounded::<String>();
        let dropped = AtomicU64::new(0);
        // Shut down by the writer on failure so the blocked reader wakes up.
        let connection = self.writer.get_ref().try_clone()?;

        let id = self.id.as_str();
        let max_requests = self.config.max_requests;
        let dispatcher = &self.dispatcher;
        let reader = &mut self.reader;
        let writer = &mut self.writer;
        let dropped_ref = &dropped;

        let (received, written) = thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let out_tx = out_tx.clone();
                scope.spawn(move || {
                    for text in job_rx.iter() {
                        match dispatcher.handle_text(&text) {
                            Some(encoded) => {
                                if out_tx.send(encoded).is_err() {
                                    debug!(session = %id, worker, "writer gone, worker exiting");
                                    break;
                                }
                            }
                            None => {
                                dropped_ref.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
            drop(job_rx);
            drop(out_tx);

            let writer_thread = scope.spawn(move || {
                let outcome = write_responses(writer, &out_rx, id);
                if let Err(err) = &outcome {
                    warn!(session = %id, error = %err, "response writer failed, closing connection");
                    drop(out_rx);
                    if let Err(shutdown_err) = connection.shutdown() {
                        debug!(session = %id, error = %shutdown_err, "connection already closed");
                    }
                }
                outcome
            });

            let mut received = 0u64;
            let read_result = loop {
                if limit_reached(max_requests, received) {
                    break Ok(());
                }
                match next_frame(reader, id) {
                    Ok(Some(text)) => {
                        received += 1;
                        trace!(session = %id, message = %text, "received message");
                        if job_tx.send(text).is_err() {
                            break Ok(());
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(err) => break Err(err),
                }
            };
            drop(job_tx);

            let written = match writer_thread.join() {
                Ok(result) => result.map_err(SessionError::from),
                Err(_) => Err(SessionError::WorkerPanicked),
            };
            (read_result.map(|()| received), written)
        });

        // A writer failure is what closed the connection, so report it first.
        let answered = written?;
        let received = received?;
        Ok(ServeStats {
            received,
            answered,
            dropped: dropped.load(Ordering::Relaxed),
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("workers", &self.config.workers)
            .finish()
    }
}

/// Drain `responses` onto the connection. A peer that went away ends the
/// loop quietly; any other write failure is returned.
fn write_responses(
    writer: &mut FrameWriter<Stream>,
    responses: &Receiver<String>,
    id: &str,
) -> std::result::Result<u64, FrameError> {
    let mut answered = 0;
    for encoded in responses.iter() {
        trace!(session = %id, message = %encoded, "sending response");
        match writer.send_text(&encoded) {
            Ok(()) => answered += 1,
            Err(err) if err.is_disconnect() => {
                warn!(session = %id, error = %err, "peer went away before response was sent");
                break;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(answered)
}

pub(crate) fn limit_reached(max_requests: Option<u64>, received: u64) -> bool {
    max_requests.is_some_and(|max| received >= max)
}

/// Next frame, or `None` once the peer has gone away.
fn next_frame(reader: &mut FrameReader<Stream>, id: &str) -> Result<Option<String>> {
    match reader.read_text() {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.is_disconnect() => {
            debug!(session = %id, "peer disconnected");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
