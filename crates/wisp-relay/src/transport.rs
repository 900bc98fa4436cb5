//! WebSocket transport adapter.
//!
//! Inbound sessions are accepted from the bound listener; outbound sessions
//! are dialed by URL and pre-marked as peers. Either way the session runs
//! two tasks: a writer draining the session's queue into the sink, and a
//! reader feeding binary messages through the frame decoder into the
//! dispatcher. The transport delivers one frame per WebSocket message; there
//! is no reassembly.

use crate::node::RelayNode;
use crate::session::Session;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use wisp_proto::Frame;

/// Accept loop over the bound listener. Runs until the listener dies.
pub(crate) async fn serve(node: Arc<RelayNode>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                let node = Arc::clone(&node);
                tokio::spawn(async move {
                    match tokio_tungstenite::accept_async(stream).await {
                        Ok(ws) => run_session(node, ws, None).await,
                        Err(err) => {
                            tracing::debug!(%remote, "websocket upgrade failed: {err}");
                        }
                    }
                });
            }
            Err(err) => {
                tracing::warn!("accept failed: {err}");
            }
        }
    }
}

/// Dial a peer URL. Failures are logged and never retried; any known-about
/// peer record stays sessionless.
pub(crate) async fn dial(node: Arc<RelayNode>, url: String) {
    tracing::info!(%url, "dialing peer");
    match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _response)) => run_session(node, ws, Some(url)).await,
        Err(err) => {
            tracing::warn!(%url, "dial failed: {err}");
        }
    }
}

/// Drive one session to completion.
///
/// `dial_url` marks outbound sessions: the handshake engine pre-marks them
/// as peers and attaches the URL to the eventual peer record.
async fn run_session<S>(node: Arc<RelayNode>, ws: WebSocketStream<S>, dial_url: Option<String>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let id = node.next_session_id();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = Session::new(id, tx);
    let (mut sink, mut stream) = ws.split();

    // writer: frames reach the wire in submit order; a queued close ends it
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
        let _ = sink.close().await;
    });

    tracing::debug!(session = id, outbound = dial_url.is_some(), "session open");
    node.handshake.begin(&session, dial_url);

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                let frame = match Frame::decode(&data) {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!(session = id, "frame decode failed, closing: {err}");
                        break;
                    }
                };
                if let Err(err) = node.dispatch(&session, frame).await {
                    tracing::warn!(session = id, "handler failed, closing: {err}");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                // text/ping/pong carry no frames
            }
            Err(err) => {
                tracing::debug!(session = id, "read error: {err}");
                break;
            }
        }
    }

    session.close();
    node.handle_close(&session).await;
    let _ = writer.await;
    tracing::debug!(session = id, "session terminated");
}
