use crate::client::CoordinatorClient;
use crate::protocol::{
    self, ChunkUploadAck, ChunkUploadRequest, Envelope, MessageType, NodeHeartbeat,
    NodeRegisterRequest,
};
use crate::server::connection::{serve_listener, MessageHandler, Reply};
use crate::server::error::ServerResult;
use crate::server::types::{NodeConfig, ShutdownSignal};
use crate::store::ChunkStore;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// A storage node: data-plane listener persisting chunks, plus a
/// long-lived uplink to the coordinator for registration and heartbeats.
pub struct NodeServer {
    config: NodeConfig,
    listener: TcpListener,
    store: Arc<ChunkStore>,
    shutdown: ShutdownSignal,
}

impl NodeServer {
    pub async fn bind(config: NodeConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let store = Arc::new(ChunkStore::new(config.data_dir.clone()));
        Ok(Self {
            config,
            listener,
            store,
            shutdown: ShutdownSignal::new(),
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn store(&self) -> Arc<ChunkStore> {
        self.store.clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Runs the coordinator uplink and the data-plane accept loop until
    /// shutdown.
    pub async fn run(self) -> ServerResult<()> {
        let data_port = self.listener.local_addr()?.port();
        tracing::info!(
            node_id = %self.config.node_id,
            addr = %self.listener.local_addr()?,
            data_dir = %self.store.base_dir().display(),
            "storage node listening"
        );

        let uplink = self.config.coordinator_addr.map(|coordinator_addr| {
            tokio::spawn(run_uplink(
                self.config.clone(),
                coordinator_addr,
                data_port,
                self.shutdown.subscribe(),
            ))
        });

        let handler = Arc::new(NodeHandler {
            store: self.store.clone(),
        });
        serve_listener(self.listener, handler, self.shutdown.subscribe()).await;

        self.shutdown.trigger();
        if let Some(uplink) = uplink {
            let _ = uplink.await;
        }
        Ok(())
    }
}

/// Registers with the coordinator and then heartbeats on a fixed period,
/// redialing after a delay whenever the uplink drops.
async fn run_uplink(
    config: NodeConfig,
    coordinator_addr: SocketAddr,
    data_port: u16,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match uplink_session(&config, coordinator_addr, data_port, &mut shutdown).await {
            Ok(()) => break, // shutdown requested
            Err(e) => {
                tracing::warn!(
                    node_id = %config.node_id,
                    "coordinator uplink failed: {e}; reconnecting in {:?}",
                    config.reconnect_delay
                );
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = shutdown.changed() => break,
        }
    }
    tracing::info!(node_id = %config.node_id, "coordinator uplink stopped");
}

async fn uplink_session(
    config: &NodeConfig,
    coordinator_addr: SocketAddr,
    data_port: u16,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), crate::client::ClientError> {
    let mut client = CoordinatorClient::connect(coordinator_addr).await?;

    let ack = client
        .register_node(&NodeRegisterRequest {
            node_id: config.node_id.clone(),
            host: config.advertised_host.clone(),
            port: data_port,
            capacity_bytes: config.capacity_bytes,
        })
        .await?;
    tracing::info!(
        node_id = %config.node_id,
        status = %ack.status,
        "registered with coordinator"
    );

    loop {
        let ack = client
            .heartbeat(&NodeHeartbeat {
                node_id: config.node_id.clone(),
                timestamp_epoch_ms: chrono::Utc::now().timestamp_millis(),
                free_bytes: 0,
            })
            .await?;
        tracing::trace!(
            node_id = %config.node_id,
            server_time = ack.server_time_epoch_ms,
            "heartbeat acknowledged"
        );

        tokio::select! {
            _ = tokio::time::sleep(config.heartbeat_interval) => {}
            _ = shutdown.changed() => return Ok(()),
        }
    }
}

/// Node-side dispatch: PING, CHUNK_UPLOAD, QUIT.
pub struct NodeHandler {
    store: Arc<ChunkStore>,
}

impl NodeHandler {
    pub fn new(store: Arc<ChunkStore>) -> Self {
        Self { store }
    }

    async fn handle_chunk_upload(&self, header: &Envelope, body: Option<Bytes>) -> Reply {
        let request: ChunkUploadRequest = match protocol::decode_payload(header) {
            Ok(request) => request,
            Err(e) => return Reply::error(format!("CHUNK_UPLOAD: {e}")),
        };

        if request.file_id.trim().is_empty() {
            return Reply::error("CHUNK_UPLOAD missing fileId");
        }
        // Negative or wider-than-u32 indexes would alias another chunk's
        // path once narrowed, so both are rejected outright.
        let chunk_index = match u32::try_from(request.chunk_index) {
            Ok(chunk_index) => chunk_index,
            Err(_) => return Reply::error("Invalid chunkIndex"),
        };
        if request.body_length <= 0 {
            return Reply::error("Invalid bodyLength");
        }

        // The declared length must match what actually arrived; on
        // mismatch nothing is written.
        let body = match body {
            Some(body) if body.len() as i64 == request.body_length => body,
            _ => return Reply::error("Body length does not match length declared in header"),
        };

        let ack = match self
            .store
            .write_chunk(&request.file_id, chunk_index, &body)
            .await
        {
            Ok(()) => ChunkUploadAck {
                file_id: request.file_id,
                chunk_index: request.chunk_index,
                status: "OK".to_string(),
                message: "Chunk uploaded successfully".to_string(),
            },
            Err(e) => {
                tracing::error!(
                    file_id = %request.file_id,
                    chunk_index = request.chunk_index,
                    "failed to write chunk: {e}"
                );
                // Recoverable for the uploader: same chunk can be retried.
                ChunkUploadAck {
                    file_id: request.file_id,
                    chunk_index: request.chunk_index,
                    status: "ERROR".to_string(),
                    message: "Failed to write chunk".to_string(),
                }
            }
        };

        match Envelope::with_payload(MessageType::ChunkUploadAck, &ack) {
            Ok(envelope) => Reply::send(envelope),
            Err(e) => Reply::error(format!("Failed to encode response: {e}")),
        }
    }
}

impl MessageHandler for NodeHandler {
    fn role(&self) -> &'static str {
        "node"
    }

    async fn on_message(
        &self,
        connection_id: u64,
        kind: MessageType,
        header: Envelope,
        body: Option<Bytes>,
    ) -> Reply {
        match kind {
            MessageType::Ping => Reply::send(Envelope::text(
                MessageType::Pong,
                format!("Pong (node connection {connection_id})"),
            )),
            MessageType::ChunkUpload => self.handle_chunk_upload(&header, body).await,
            MessageType::Quit => Reply::close(Envelope::text(
                MessageType::Goodbye,
                "Closing node connection",
            )),
            other => Reply::error(format!("Unknown message type: {other}")),
        }
    }
}
