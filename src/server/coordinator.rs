use crate::protocol::{
    self, Envelope, FilesCommitAck, FilesCommitRequest, FilesInitRequest, FilesInitResponse,
    MessageType, NodeHeartbeat, NodeHeartbeatAck, NodeRegisterAck, NodeRegisterRequest,
};
use crate::registry::{spawn_sweeper, Registry};
use crate::server::connection::{serve_listener, MessageHandler, Reply};
use crate::server::error::ServerResult;
use crate::server::types::{CoordinatorConfig, ShutdownSignal};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// The coordinator control plane: accepts client and node connections,
/// owns the registries, and runs the liveness sweeper.
pub struct CoordinatorServer {
    config: CoordinatorConfig,
    listener: TcpListener,
    registry: Arc<Registry>,
    shutdown: ShutdownSignal,
}

impl CoordinatorServer {
    pub async fn bind(config: CoordinatorConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let registry = Arc::new(Registry::new(config.heartbeat_timeout));
        Ok(Self {
            config,
            listener,
            registry,
            shutdown: ShutdownSignal::new(),
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the registries; useful for inspection and tests.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Trigger that force-stops the accept loop, every connection task,
    /// and the sweeper.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Runs the sweeper and the accept loop until shutdown.
    pub async fn run(self) -> ServerResult<()> {
        tracing::info!(addr = %self.listener.local_addr()?, "coordinator listening");

        let sweeper = spawn_sweeper(
            self.registry.clone(),
            self.config.sweep_interval,
            self.shutdown.subscribe(),
        );

        let handler = Arc::new(CoordinatorHandler {
            registry: self.registry.clone(),
        });
        serve_listener(self.listener, handler, self.shutdown.subscribe()).await;

        self.shutdown.trigger();
        let _ = sweeper.await;
        Ok(())
    }
}

/// Coordinator-side dispatch: PING, FILES_INIT_REQUEST, FILES_COMMIT,
/// NODE_REGISTER, NODE_HEARTBEAT, QUIT.
pub struct CoordinatorHandler {
    registry: Arc<Registry>,
}

impl CoordinatorHandler {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    fn handle_files_init(&self, header: &Envelope) -> Reply {
        let request: FilesInitRequest = match protocol::decode_payload(header) {
            Ok(request) => request,
            Err(e) => return Reply::error(format!("FILES_INIT_REQUEST: {e}")),
        };

        if request.filename.trim().is_empty() {
            return Reply::error("Missing file name");
        }
        if request.total_size_bytes <= 0 {
            return Reply::error("totalSizeBytes must be greater than 0");
        }
        if request.chunk_size_bytes <= 0 {
            return Reply::error("chunkSizeBytes must be greater than 0");
        }

        let meta = self.registry.init_file_upload(
            &request.filename,
            request.total_size_bytes,
            request.chunk_size_bytes,
        );

        // The upload target is chosen at init time; if no node is UP the
        // client must retry later.
        let node = match self.registry.pick_active_node() {
            Some(node) => node,
            None => return Reply::error("No active nodes available"),
        };

        let response = FilesInitResponse {
            file_id: meta.file_id,
            total_chunks: meta.total_chunks,
            chunk_size_bytes: meta.chunk_size_bytes,
            upload_host: node.host,
            upload_port: node.port,
        };
        match Envelope::with_payload(MessageType::FilesInitResponse, &response) {
            Ok(envelope) => Reply::send(envelope),
            Err(e) => Reply::error(format!("Failed to encode response: {e}")),
        }
    }

    fn handle_files_commit(&self, header: &Envelope) -> Reply {
        let request: FilesCommitRequest = match protocol::decode_payload(header) {
            Ok(request) => request,
            Err(e) => return Reply::error(format!("FILES_COMMIT: {e}")),
        };

        if request.file_id.trim().is_empty() {
            return Reply::error("fileId is required");
        }

        if !self.registry.commit_file(&request.file_id) {
            return Reply::error(format!("Unknown fileId: {}", request.file_id));
        }

        let ack = FilesCommitAck {
            file_id: request.file_id,
            status: "OK".to_string(),
            message: "File committed successfully".to_string(),
        };
        match Envelope::with_payload(MessageType::FilesCommitAck, &ack) {
            Ok(envelope) => Reply::send(envelope),
            Err(e) => Reply::error(format!("Failed to encode response: {e}")),
        }
    }

    fn handle_node_register(&self, header: &Envelope) -> Reply {
        let request: NodeRegisterRequest = match protocol::decode_payload(header) {
            Ok(request) => request,
            Err(e) => return Reply::error(format!("NODE_REGISTER: {e}")),
        };

        // Registration failures get a typed ack rather than a generic
        // ERROR, so nodes can distinguish rejection from protocol trouble.
        let ack = if request.node_id.trim().is_empty()
            || request.host.trim().is_empty()
            || request.port == 0
        {
            NodeRegisterAck {
                status: "ERROR".to_string(),
                message: "Missing/invalid fields (nodeId, host, port)".to_string(),
            }
        } else if self.registry.register_node(
            &request.node_id,
            &request.host,
            request.port,
            request.capacity_bytes,
        ) {
            NodeRegisterAck {
                status: "OK".to_string(),
                message: "Node registered".to_string(),
            }
        } else {
            NodeRegisterAck {
                status: "ERROR".to_string(),
                message: "Registration failed (invalid fields)".to_string(),
            }
        };

        match Envelope::with_payload(MessageType::NodeRegisterAck, &ack) {
            Ok(envelope) => Reply::send(envelope),
            Err(e) => Reply::error(format!("Failed to encode response: {e}")),
        }
    }

    fn handle_node_heartbeat(&self, header: &Envelope) -> Reply {
        let heartbeat: NodeHeartbeat = match protocol::decode_payload(header) {
            Ok(heartbeat) => heartbeat,
            Err(e) => return Reply::error(format!("NODE_HEARTBEAT: {e}")),
        };

        if heartbeat.node_id.trim().is_empty() {
            return Reply::error("Heartbeat missing nodeId");
        }

        let now = chrono::Utc::now().timestamp_millis();
        let timestamp = if heartbeat.timestamp_epoch_ms > 0 {
            heartbeat.timestamp_epoch_ms
        } else {
            now
        };

        if !self.registry.handle_heartbeat(&heartbeat.node_id, timestamp) {
            return Reply::error(format!("Unknown nodeId: {}", heartbeat.node_id));
        }

        let ack = NodeHeartbeatAck {
            status: "OK".to_string(),
            server_time_epoch_ms: now,
        };
        match Envelope::with_payload(MessageType::NodeHeartbeatAck, &ack) {
            Ok(envelope) => Reply::send(envelope),
            Err(e) => Reply::error(format!("Failed to encode response: {e}")),
        }
    }
}

impl MessageHandler for CoordinatorHandler {
    fn role(&self) -> &'static str {
        "coordinator"
    }

    async fn on_message(
        &self,
        connection_id: u64,
        kind: MessageType,
        header: Envelope,
        _body: Option<Bytes>,
    ) -> Reply {
        match kind {
            MessageType::Ping => Reply::send(Envelope::text(
                MessageType::Pong,
                format!("Pong (connection {connection_id})"),
            )),
            MessageType::FilesInitRequest => self.handle_files_init(&header),
            MessageType::FilesCommit => self.handle_files_commit(&header),
            MessageType::NodeRegister => self.handle_node_register(&header),
            MessageType::NodeHeartbeat => self.handle_node_heartbeat(&header),
            MessageType::Quit => Reply::close(Envelope::text(
                MessageType::Goodbye,
                "Closing connection",
            )),
            other => Reply::error(format!("Unknown message type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_heartbeat_timestamp_defaults_to_server_time() {
        let registry = Arc::new(Registry::default());
        registry.register_node("n1", "localhost", 9100, 0);
        let handler = CoordinatorHandler::new(registry.clone());

        for timestamp_epoch_ms in [0, -5] {
            // Backdate the record so the refresh is observable.
            registry.handle_heartbeat("n1", 1);

            let before = chrono::Utc::now().timestamp_millis();
            let header = Envelope::with_payload(
                MessageType::NodeHeartbeat,
                &NodeHeartbeat {
                    node_id: "n1".to_string(),
                    timestamp_epoch_ms,
                    free_bytes: 0,
                },
            )
            .unwrap();
            let reply = handler.handle_node_heartbeat(&header);

            assert_eq!(
                reply.message.message_type(),
                Some(MessageType::NodeHeartbeatAck)
            );
            assert!(registry.node("n1").unwrap().last_seen_epoch_ms >= before);
        }
    }
}
