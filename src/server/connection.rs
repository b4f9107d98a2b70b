use crate::protocol::{Envelope, MessageType};
use crate::transport::{FrameReader, FrameWriter, TransportError};
use bytes::Bytes;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One reply frame, plus whether the connection closes once it is flushed
/// (the QUIT/GOODBYE handshake).
#[derive(Debug)]
pub struct Reply {
    pub message: Envelope,
    pub close_after_send: bool,
}

impl Reply {
    pub fn send(message: Envelope) -> Self {
        Self {
            message,
            close_after_send: false,
        }
    }

    pub fn close(message: Envelope) -> Self {
        Self {
            message,
            close_after_send: true,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self::send(Envelope::text(MessageType::Error, detail))
    }
}

/// Role-specific message dispatch behind the shared connection skeleton.
///
/// A handler must turn every message into exactly one reply; validation,
/// not-found and storage failures become typed replies, never errors that
/// tear down the connection.
pub trait MessageHandler: Send + Sync + 'static {
    /// Short role tag used in log lines.
    fn role(&self) -> &'static str;

    /// Handle one decoded message. `body` holds the raw frame body when
    /// the peer sent one.
    fn on_message(
        &self,
        connection_id: u64,
        kind: MessageType,
        header: Envelope,
        body: Option<Bytes>,
    ) -> impl Future<Output = Reply> + Send;
}

/// Owns one accepted socket for its lifetime: greets the peer, then loops
/// reading a frame, dispatching it, and writing the single reply.
///
/// Exits on peer close, transport error, a handler-requested close, or
/// shutdown. Unknown and missing message types are answered with ERROR and
/// the loop continues.
pub async fn run_connection<H: MessageHandler>(
    stream: TcpStream,
    connection_id: u64,
    handler: Arc<H>,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    let role = handler.role();
    tracing::info!(role, connection_id, %peer, "connection started");

    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    let welcome = Envelope::text(
        MessageType::Welcome,
        format!("Connection {connection_id} ready."),
    );
    if let Err(e) = writer.write_frame(welcome, None).await {
        tracing::warn!(role, connection_id, "failed to send WELCOME: {e}");
        return;
    }

    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => break,
            frame = reader.read_frame() => frame,
        };

        let (header, body) = match frame {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(role, connection_id, "peer disconnected");
                break;
            }
            Err(e @ (TransportError::Io(_) | TransportError::Truncated)) => {
                tracing::warn!(role, connection_id, "connection error: {e}");
                break;
            }
            Err(e) => {
                tracing::warn!(role, connection_id, "protocol error, closing: {e}");
                break;
            }
        };

        let reply = if header.kind.trim().is_empty() {
            Reply::error("Missing message type")
        } else {
            match header.message_type() {
                Some(kind) => handler.on_message(connection_id, kind, header, body).await,
                None => Reply::error(format!("Unknown message type: {}", header.kind)),
            }
        };

        let close = reply.close_after_send;
        if let Err(e) = writer.write_frame(reply.message, None).await {
            tracing::warn!(role, connection_id, "failed to write reply: {e}");
            break;
        }
        if close {
            break;
        }
    }

    tracing::info!(role, connection_id, "connection closed");
}

/// Generic accept loop: one spawned task per accepted socket, tagged with
/// a monotonically increasing connection id.
///
/// Returns when the shutdown signal flips (remaining connection tasks are
/// aborted — no in-flight request is guaranteed to complete) or when the
/// listener fails.
pub async fn serve_listener<H: MessageHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    mut shutdown: watch::Receiver<bool>,
) {
    let role = handler.role();
    let next_id = AtomicU64::new(1);
    let tasks: Mutex<Vec<JoinHandle<()>>> = Mutex::new(Vec::new());

    loop {
        let accepted = tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                tracing::debug!(role, %peer, "accepted connection");
                let connection_id = next_id.fetch_add(1, Ordering::Relaxed);
                let task = tokio::spawn(run_connection(
                    stream,
                    connection_id,
                    handler.clone(),
                    shutdown.clone(),
                ));

                let mut tasks = tasks.lock();
                tasks.retain(|t| !t.is_finished());
                tasks.push(task);
            }
            Err(e) => {
                tracing::error!(role, "accept failed: {e}");
                break;
            }
        }
    }

    for task in tasks.lock().drain(..) {
        task.abort();
    }
    tracing::info!(role, "listener stopped");
}
