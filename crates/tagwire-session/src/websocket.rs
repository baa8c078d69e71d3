//! WebSocket sessions.
//!
//! Every text message carries exactly one envelope, so no length framing is
//! involved. Dispatch runs on the blocking pool as in
//! [`serve_async`](crate::serve_async); responses are sent as text messages
//! in completion order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tagwire_dispatch::{decode_response, encode_request, Dispatcher, Request, Response};
use tagwire_transport::{Endpoint, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, trace, warn};

use crate::async_session::{dispatch_blocking, drain, log_session_end};
use crate::error::{Result, SessionError};
use crate::session::{limit_reached, ServeStats, SessionConfig};

/// Serve one upgraded WebSocket until the peer closes or `max_requests` is hit.
///
/// Binary messages are counted as dropped. Pings are answered by the
/// protocol layer.
pub async fn serve_websocket<S>(
    socket: WebSocketStream<S>,
    dispatcher: Dispatcher,
    config: SessionConfig,
) -> Result<ServeStats>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut messages) = socket.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut answered = 0u64;
        while let Some(encoded) = out_rx.recv().await {
            trace!(message = %encoded, "sending response");
            match sink.send(Message::Text(encoded)).await {
                Ok(()) => answered += 1,
                Err(err) if is_closed(&err) => {
                    warn!(error = %err, "peer went away before response was sent");
                    return Ok(answered);
                }
                Err(err) => {
                    warn!(error = %err, "response writer failed");
                    return Err(SessionError::from(err));
                }
            }
        }
        if let Err(err) = sink.close().await {
            debug!(error = %err, "websocket close handshake failed");
        }
        Ok::<u64, SessionError>(answered)
    });

    let dropped = Arc::new(AtomicU64::new(0));
    let mut in_flight = JoinSet::new();
    let mut received = 0u64;

    while !limit_reached(config.max_requests, received) {
        let next = tokio::select! {
            next = messages.next() => next,
            () = out_tx.closed() => {
                debug!(received, "response writer stopped, no longer reading");
                break;
            }
        };
        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => {
                received += 1;
                dropped.fetch_add(1, Ordering::Relaxed);
                warn!(len = bytes.len(), "dropping binary message");
                continue;
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "peer closed websocket");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) if is_closed(&err) => break,
            Some(Err(err)) => return Err(err.into()),
            None => break,
        };
        received += 1;
        trace!(message = %text, "received message");
        dispatch_blocking(&mut in_flight, &dispatcher, &out_tx, &dropped, text);
    }
    debug!(received, "websocket drained, waiting for in-flight requests");

    drain(&mut in_flight).await?;
    drop(out_tx);

    let answered = writer.await.map_err(|_| SessionError::WorkerPanicked)??;
    Ok(ServeStats {
        received,
        answered,
        dropped: dropped.load(Ordering::Relaxed),
    })
}

/// Accept WebSocket upgrades on the authority of `endpoint` and serve each
/// connection concurrently. Runs until accepting fails.
pub async fn serve_websocket_endpoint(
    endpoint: &Endpoint,
    dispatcher: Dispatcher,
    config: SessionConfig,
) -> Result<()> {
    let authority = websocket_authority(endpoint)?;
    let listener = TcpListener::bind(authority.as_str())
        .await
        .map_err(|source| TransportError::Bind {
            address: authority.clone(),
            source,
        })?;
    info!(endpoint = %endpoint, transport = endpoint.transport_name(), "listening (async)");

    let mut next_id = 1u64;
    loop {
        let (stream, peer) = listener.accept().await.map_err(TransportError::Accept)?;
        let _ = stream.set_nodelay(true);
        let id = next_id;
        next_id += 1;

        let dispatcher = dispatcher.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let ws_config = socket_config(&config);
            match tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await {
                Ok(socket) => {
                    debug!(session = id, peer = %peer, "websocket upgraded");
                    log_session_end(id, serve_websocket(socket, dispatcher, config).await);
                }
                Err(err) => warn!(session = id, peer = %peer, error = %err, "websocket handshake failed"),
            }
        });
    }
}

/// Dial a controller at `endpoint` and answer its requests until it closes.
pub async fn connect_websocket(
    endpoint: &Endpoint,
    dispatcher: Dispatcher,
    config: SessionConfig,
) -> Result<ServeStats> {
    let socket = dial(endpoint, &config).await?;
    info!(endpoint = %endpoint, transport = endpoint.transport_name(), "connected, serving");
    serve_websocket(socket, dispatcher, config).await
}

/// Send one request over a fresh WebSocket and wait for its response.
///
/// Messages that are not the matching response are skipped.
pub async fn call_websocket(
    endpoint: &Endpoint,
    request: &Request,
    timeout: Duration,
) -> Result<Response> {
    tokio::time::timeout(timeout, exchange(endpoint, request))
        .await
        .map_err(|_| SessionError::Timeout(timeout))?
}

async fn exchange(endpoint: &Endpoint, request: &Request) -> Result<Response> {
    let mut socket = dial(endpoint, &SessionConfig::default()).await?;
    socket.send(Message::Text(encode_request(request)?)).await?;

    while let Some(message) = socket.next().await {
        let Message::Text(text) = message? else {
            continue;
        };
        match decode_response(text.as_bytes()) {
            Ok(response) if response.sequence == request.sequence => {
                if let Err(err) = socket.close(None).await {
                    debug!(error = %err, "websocket close handshake failed");
                }
                return Ok(response);
            }
            Ok(response) => debug!(received = response.sequence, "skipping unrelated response"),
            Err(err) => warn!(error = %err, "ignoring undecodable response"),
        }
    }
    Err(SessionError::Disconnected(format!(
        "connection closed while waiting for sequence {}",
        request.sequence
    )))
}

async fn dial(
    endpoint: &Endpoint,
    config: &SessionConfig,
) -> Result<WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>> {
    let Endpoint::WebSocket(url) = endpoint else {
        return Err(not_websocket(endpoint).into());
    };
    let (socket, _response) =
        tokio_tungstenite::connect_async_with_config(url.as_str(), Some(socket_config(config)), true)
            .await
            .map_err(|err| match err {
                WsError::Io(source) => SessionError::Transport(TransportError::Connect {
                    address: url.clone(),
                    source,
                }),
                other => SessionError::from(other),
            })?;
    Ok(socket)
}

fn socket_config(config: &SessionConfig) -> WebSocketConfig {
    WebSocketConfig {
        max_message_size: Some(config.frame.max_payload_size),
        max_frame_size: Some(config.frame.max_payload_size),
        ..WebSocketConfig::default()
    }
}

fn websocket_authority(endpoint: &Endpoint) -> Result<String> {
    endpoint
        .websocket_authority()
        .ok_or_else(|| not_websocket(endpoint).into())
}

fn not_websocket(endpoint: &Endpoint) -> TransportError {
    TransportError::InvalidEndpoint {
        input: endpoint.to_string(),
        reason: "expected a ws:// URL".to_string(),
    }
}

fn is_closed(err: &WsError) -> bool {
    match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(io) => matches!(
            io.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
