use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    /// File record created.
    Init,
    /// Upload in progress.
    Uploading,
    /// Upload committed.
    Complete,
}

/// Per-file record tracked by the coordinator. Holds no chunk data, only
/// information about the file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: String,
    pub file_name: String,
    pub total_size_bytes: i64,
    pub chunk_size_bytes: i64,
    pub total_chunks: u32,
    pub created_at: DateTime<Utc>,
    pub status: FileStatus,
}

impl FileMetadata {
    pub fn new(
        file_id: String,
        file_name: String,
        total_size_bytes: i64,
        chunk_size_bytes: i64,
    ) -> Self {
        Self {
            file_id,
            file_name,
            total_size_bytes,
            chunk_size_bytes,
            total_chunks: Self::chunk_count(total_size_bytes, chunk_size_bytes),
            created_at: Utc::now(),
            status: FileStatus::Init,
        }
    }

    /// Integer division: a trailing partial chunk is not counted.
    /// Quotients beyond `u32::MAX` saturate instead of wrapping.
    pub fn chunk_count(total_size_bytes: i64, chunk_size_bytes: i64) -> u32 {
        u32::try_from(total_size_bytes / chunk_size_bytes).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Up,
    Down,
}

/// A storage node registered with the coordinator.
///
/// `status` has exactly two legal mutations: the sweep demotes Up -> Down
/// on heartbeat timeout, and an accepted heartbeat promotes Down -> Up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub capacity_bytes: i64,
    pub last_seen_epoch_ms: i64,
    pub status: NodeStatus,
}

impl NodeInfo {
    pub fn new(
        node_id: String,
        host: String,
        port: u16,
        capacity_bytes: i64,
        last_seen_epoch_ms: i64,
    ) -> Self {
        Self {
            node_id,
            host,
            port,
            capacity_bytes,
            last_seen_epoch_ms,
            status: NodeStatus::Up,
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self.status, NodeStatus::Up)
    }

    /// A heartbeat refreshes the last-seen clock and revives a DOWN node.
    pub fn record_heartbeat(&mut self, epoch_ms: i64) {
        self.last_seen_epoch_ms = epoch_ms;
        self.status = NodeStatus::Up;
    }

    pub fn mark_down(&mut self) {
        self.status = NodeStatus::Down;
    }
}
