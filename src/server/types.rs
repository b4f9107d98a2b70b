use crate::registry::{DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_SWEEP_INTERVAL};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for the coordinator control plane.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,

    /// Period of the background liveness sweep.
    pub sweep_interval: Duration,

    /// How long a node may go without a heartbeat before the sweep marks
    /// it DOWN.
    pub heartbeat_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".parse().unwrap(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }
}

/// Configuration for a storage node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Unique identifier this node registers under.
    pub node_id: String,

    /// Data-plane listen address.
    pub bind_addr: SocketAddr,

    /// Host clients are told to upload to (paired with the actually bound
    /// data-plane port).
    pub advertised_host: String,

    /// Coordinator to register with; `None` runs the data plane without an
    /// uplink (the node must then be registered out of band).
    pub coordinator_addr: Option<SocketAddr>,

    /// Base directory for the chunk store.
    pub data_dir: PathBuf,

    /// Advertised storage capacity.
    pub capacity_bytes: i64,

    /// Period between heartbeats on the uplink.
    pub heartbeat_interval: Duration,

    /// Delay before redialing the coordinator after an uplink failure.
    pub reconnect_delay: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: format!("node-{}", uuid::Uuid::new_v4()),
            bind_addr: "0.0.0.0:9100".parse().unwrap(),
            advertised_host: "localhost".to_string(),
            coordinator_addr: Some("127.0.0.1:9000".parse().unwrap()),
            data_dir: PathBuf::from("node-data"),
            capacity_bytes: 50_000_000_000,
            heartbeat_interval: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Broadcast shutdown flag shared by the accept loops, every connection
/// task, the sweeper, and the node uplink.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Flips the flag; every subscriber unblocks. Idempotent.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
