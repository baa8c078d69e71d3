//! Tokio-hosted sessions.
//!
//! Frames are read with [`TextFrameCodec`]; each request is dispatched on the
//! blocking pool, and a single task writes responses as they complete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tagwire_dispatch::Dispatcher;
use tagwire_frame::{FrameError, TextFrameCodec};
use tagwire_transport::{Endpoint, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, SessionError};
use crate::session::{limit_reached, ServeStats, SessionConfig};
use crate::websocket::serve_websocket_endpoint;

/// Serve one connection until the peer disconnects or `max_requests` is hit.
///
/// `config.workers` is ignored here; concurrency comes from the runtime.
pub async fn serve_async<T>(io: T, dispatcher: Dispatcher, config: SessionConfig) -> Result<ServeStats>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let codec = TextFrameCodec::with_max_payload(config.frame.max_payload_size);
    let (read_half, write_half) = tokio::io::split(io);
    let mut frames_in = FramedRead::new(read_half, codec);
    let mut frames_out = FramedWrite::new(write_half, codec);

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut answered = 0u64;
        while let Some(encoded) = out_rx.recv().await {
            trace!(message = %encoded, "sending response");
            match frames_out.send(encoded).await {
                Ok(()) => answered += 1,
                Err(err) if err.is_disconnect() => {
                    warn!(error = %err, "peer went away before response was sent");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "response writer failed");
                    return Err(err);
                }
            }
        }
        Ok::<u64, FrameError>(answered)
    });

    let dropped = Arc::new(AtomicU64::new(0));
    let mut in_flight = JoinSet::new();
    let mut received = 0u64;

    while !limit_reached(config.max_requests, received) {
        let next = tokio::select! {
            next = frames_in.next() => next,
            () = out_tx.closed() => {
                debug!(received, "response writer stopped, no longer reading");
                break;
            }
        };
        let text = match next {
            Some(Ok(text)) => text,
            Some(Err(err)) if err.is_disconnect() => break,
            Some(Err(err)) => return Err(err.into()),
            None => break,
        };
        received += 1;
        trace!(message = %text, "received message");

        dispatch_blocking(&mut in_flight, &dispatcher, &out_tx, &dropped, text);
    }
    debug!(received, "connection drained, waiting for in-flight requests");

    drain(&mut in_flight).await?;
    drop(out_tx);

    let answered = writer.await.map_err(|_| SessionError::WorkerPanicked)??;
    Ok(ServeStats {
        received,
        answered,
        dropped: dropped.load(Ordering::Relaxed),
    })
}

/// Run one request on the blocking pool and queue its response.
pub(crate) fn dispatch_blocking(
    in_flight: &mut JoinSet<()>,
    dispatcher: &Dispatcher,
    out_tx: &mpsc::UnboundedSender<String>,
    dropped: &Arc<AtomicU64>,
    text: String,
) {
    let dispatcher = dispatcher.clone();
    let out_tx = out_tx.clone();
    let dropped = Arc::clone(dropped);
    in_flight.spawn_blocking(move || match dispatcher.handle_text(&text) {
        Some(encoded) => {
            if out_tx.send(encoded).is_err() {
                debug!("response writer gone, discarding response");
            }
        }
        None => {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    });
}

/// Wait for every dispatched request to finish.
pub(crate) async fn drain(in_flight: &mut JoinSet<()>) -> Result<()> {
    while let Some(joined) = in_flight.join_next().await {
        if joined.is_err() {
            return Err(SessionError::WorkerPanicked);
        }
    }
    Ok(())
}

/// Bind `endpoint` and serve every accepted connection concurrently.
///
/// WebSocket endpoints are handed to the WebSocket listener. Runs until
/// accepting fails.
pub async fn serve_endpoint_async(
    endpoint: &Endpoint,
    dispatcher: Dispatcher,
    config: SessionConfig,
) -> Result<()> {
    match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            remove_stale_socket(path)?;
            let listener = tokio::net::UnixListener::bind(path).map_err(|source| {
                TransportError::Bind {
                    address: endpoint.to_string(),
                    source,
                }
            })?;
            info!(endpoint = %endpoint, transport = endpoint.transport_name(), "listening (async)");
            let mut next_id = 1u64;
            loop {
                let (stream, _) = listener.accept().await.map_err(TransportError::Accept)?;
                spawn_session(next_id, stream, dispatcher.clone(), config.clone());
                next_id += 1;
            }
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(TransportError::Unsupported(endpoint.to_string()).into()),
        Endpoint::WebSocket(_) => serve_websocket_endpoint(endpoint, dispatcher, config).await,
        Endpoint::Tcp(address) => {
            let listener = tokio::net::TcpListener::bind(address.as_str())
                .await
                .map_err(|source| TransportError::Bind {
                    address: address.clone(),
                    source,
                })?;
            info!(endpoint = %endpoint, transport = endpoint.transport_name(), "listening (async)");
            let mut next_id = 1u64;
            loop {
                let (stream, peer) = listener.accept().await.map_err(TransportError::Accept)?;
                let _ = stream.set_nodelay(true);
                debug!(peer = %peer, "accepted connection");
                spawn_session(next_id, stream, dispatcher.clone(), config.clone());
                next_id += 1;
            }
        }
    }
}

pub(crate) fn log_session_end(id: u64, outcome: Result<ServeStats>) {
    match outcome {
        Ok(stats) => info!(
            session = id,
            received = stats.received,
            answered = stats.answered,
            dropped = stats.dropped,
            "session ended"
        ),
        Err(err) => warn!(session = id, error = %err, "session failed"),
    }
}

fn spawn_session<T>(id: u64, io: T, dispatcher: Dispatcher, config: SessionConfig)
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    tokio::spawn(async move {
        log_session_end(id, serve_async(io, dispatcher, config).await);
    });
}

#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            std::fs::remove_file(path).map_err(TransportError::Io)?;
            Ok(())
        }
        Ok(_) => Err(TransportError::Bind {
            address: path.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "path exists and is not a socket",
            ),
        }
        .into()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(TransportError::Io(err).into()),
    }
}
