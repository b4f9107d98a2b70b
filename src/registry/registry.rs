use crate::registry::types::{FileMetadata, FileStatus, NodeInfo, NodeStatus};
use dashmap::DashMap;
use std::time::Duration;

pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(15);

/// Concurrent maps of file metadata and node metadata.
///
/// Shared via `Arc` between every connection task and the sweeper; each
/// operation touches a single key, so cross-key consistency is never
/// needed.
pub struct Registry {
    files: DashMap<String, FileMetadata>,
    nodes: DashMap<String, NodeInfo>,
    heartbeat_timeout: Duration,
}

impl Registry {
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            files: DashMap::new(),
            nodes: DashMap::new(),
            heartbeat_timeout,
        }
    }

    /// Creates a new file record with a fresh id and returns it.
    ///
    /// Uniqueness comes from the random id generator, not from
    /// retry-on-collision; given valid inputs this always succeeds.
    pub fn init_file_upload(
        &self,
        filename: &str,
        total_size_bytes: i64,
        chunk_size_bytes: i64,
    ) -> FileMetadata {
        let file_id = uuid::Uuid::new_v4().to_string();

        let mut metadata = FileMetadata::new(
            file_id.clone(),
            filename.to_string(),
            total_size_bytes,
            chunk_size_bytes,
        );
        metadata.status = FileStatus::Uploading;

        self.files.insert(file_id, metadata.clone());

        tracing::info!(
            file_id = %metadata.file_id,
            filename,
            total_chunks = metadata.total_chunks,
            "file record created"
        );
        metadata
    }

    /// Marks a file COMPLETE. Returns false for an unknown id; committing
    /// an already-COMPLETE file succeeds again with no side effect.
    pub fn commit_file(&self, file_id: &str) -> bool {
        match self.files.get_mut(file_id) {
            Some(mut entry) => {
                entry.status = FileStatus::Complete;
                tracing::info!(file_id, "file committed");
                true
            }
            None => false,
        }
    }

    /// Inserts or replaces the node record with status UP and a fresh
    /// last-seen clock. Re-registration with the same id is idempotent.
    pub fn register_node(&self, node_id: &str, host: &str, port: u16, capacity_bytes: i64) -> bool {
        if node_id.trim().is_empty() || host.trim().is_empty() || port == 0 {
            return false;
        }

        let now = chrono::Utc::now().timestamp_millis();
        let node = NodeInfo::new(
            node_id.to_string(),
            host.to_string(),
            port,
            capacity_bytes,
            now,
        );
        self.nodes.insert(node_id.to_string(), node);

        tracing::info!(node_id, host, port, "node registered");
        true
    }

    /// Refreshes a node's last-seen clock and forces it UP. Returns false
    /// for an unknown node id.
    pub fn handle_heartbeat(&self, node_id: &str, timestamp_epoch_ms: i64) -> bool {
        match self.nodes.get_mut(node_id) {
            Some(mut entry) => {
                let was_down = !entry.is_up();
                entry.record_heartbeat(timestamp_epoch_ms);
                if was_down {
                    tracing::info!(node_id, "node revived by heartbeat");
                }
                true
            }
            None => false,
        }
    }

    /// Returns any one UP node. Selection is arbitrary placement, not load
    /// balancing.
    pub fn pick_active_node(&self) -> Option<NodeInfo> {
        self.nodes
            .iter()
            .find(|entry| entry.value().is_up())
            .map(|entry| entry.value().clone())
    }

    pub fn file(&self, file_id: &str) -> Option<FileMetadata> {
        self.files.get(file_id).map(|entry| entry.value().clone())
    }

    pub fn node(&self, node_id: &str) -> Option<NodeInfo> {
        self.nodes.get(node_id).map(|entry| entry.value().clone())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Demotes every UP node whose heartbeat has gone stale. Returns the
    /// number of nodes demoted. The sweep is the only demoter.
    pub fn sweep_once(&self) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let timeout_ms = self.heartbeat_timeout.as_millis() as i64;
        let mut demoted = 0;

        for mut entry in self.nodes.iter_mut() {
            let age = now - entry.last_seen_epoch_ms;
            if entry.is_up() && age > timeout_ms {
                entry.mark_down();
                demoted += 1;
                tracing::warn!(node_id = %entry.node_id, age_ms = age, "node marked DOWN");
            }
        }
        demoted
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    #[test]
    fn total_chunks_uses_integer_division() {
        assert_eq!(FileMetadata::chunk_count(12345, 4096), 3);
        assert_eq!(FileMetadata::chunk_count(8192, 4096), 2);
        assert_eq!(FileMetadata::chunk_count(4095, 4096), 0);
        assert_eq!(FileMetadata::chunk_count(1, 1), 1);
    }

    #[test]
    fn chunk_count_saturates_instead_of_wrapping() {
        assert_eq!(FileMetadata::chunk_count(u32::MAX as i64, 1), u32::MAX);
        assert_eq!(FileMetadata::chunk_count(u32::MAX as i64 + 1, 1), u32::MAX);
        assert_eq!(FileMetadata::chunk_count(i64::MAX, 1), u32::MAX);
    }

    #[test]
    fn init_file_upload_creates_uploading_record() {
        let registry = Registry::default();
        let meta = registry.init_file_upload("a.txt", 12345, 4096);

        assert_eq!(meta.total_chunks, 3);
        assert_eq!(meta.status, FileStatus::Uploading);

        let stored = registry.file(&meta.file_id).unwrap();
        assert_eq!(stored.file_name, "a.txt");
        assert_eq!(stored.status, FileStatus::Uploading);
    }

    #[test]
    fn distinct_uploads_get_distinct_ids() {
        let registry = Registry::default();
        let a = registry.init_file_upload("a.txt", 4096, 4096);
        let b = registry.init_file_upload("a.txt", 4096, 4096);
        assert_ne!(a.file_id, b.file_id);
    }

    #[test]
    fn commit_unknown_file_fails() {
        let registry = Registry::default();
        assert!(!registry.commit_file("no-such-file"));
    }

    #[test]
    fn commit_is_idempotent() {
        let registry = Registry::default();
        let meta = registry.init_file_upload("a.txt", 8192, 4096);

        assert!(registry.commit_file(&meta.file_id));
        assert_eq!(
            registry.file(&meta.file_id).unwrap().status,
            FileStatus::Complete
        );

        assert!(registry.commit_file(&meta.file_id));
        assert_eq!(
            registry.file(&meta.file_id).unwrap().status,
            FileStatus::Complete
        );
    }

    #[test]
    fn register_node_validates_fields() {
        let registry = Registry::default();
        assert!(!registry.register_node("", "localhost", 9100, 0));
        assert!(!registry.register_node("n1", "  ", 9100, 0));
        assert!(!registry.register_node("n1", "localhost", 0, 0));
        assert!(registry.register_node("n1", "localhost", 9100, 1024));
    }

    #[test]
    fn re_registration_replaces_record() {
        let registry = Registry::default();
        registry.register_node("n1", "localhost", 9100, 100);
        registry.register_node("n1", "otherhost", 9200, 200);

        assert_eq!(registry.node_count(), 1);
        let node = registry.node("n1").unwrap();
        assert_eq!(node.host, "otherhost");
        assert_eq!(node.port, 9200);
    }

    #[test]
    fn heartbeat_unknown_node_fails() {
        let registry = Registry::default();
        assert!(!registry.handle_heartbeat("ghost", now_ms()));
    }

    #[test]
    fn stale_node_goes_down_and_heartbeat_revives_it() {
        let registry = Registry::new(Duration::from_secs(15));
        registry.register_node("n1", "localhost", 9100, 0);

        // Backdate the node past the timeout, then sweep.
        assert!(registry.handle_heartbeat("n1", now_ms() - 20_000));
        assert_eq!(registry.sweep_once(), 1);
        assert_eq!(registry.node("n1").unwrap().status, NodeStatus::Down);

        // A fresh heartbeat promotes it straight back to UP.
        assert!(registry.handle_heartbeat("n1", now_ms()));
        assert_eq!(registry.node("n1").unwrap().status, NodeStatus::Up);
        assert_eq!(registry.sweep_once(), 0);
    }

    #[test]
    fn sweep_leaves_fresh_nodes_alone() {
        let registry = Registry::new(Duration::from_secs(15));
        registry.register_node("n1", "localhost", 9100, 0);
        assert_eq!(registry.sweep_once(), 0);
        assert!(registry.node("n1").unwrap().is_up());
    }

    #[test]
    fn pick_active_node_skips_down_nodes() {
        let registry = Registry::new(Duration::from_secs(15));
        assert!(registry.pick_active_node().is_none());

        registry.register_node("n1", "localhost", 9100, 0);
        registry.handle_heartbeat("n1", now_ms() - 60_000);
        registry.sweep_once();
        assert!(registry.pick_active_node().is_none());

        registry.register_node("n2", "localhost", 9200, 0);
        let picked = registry.pick_active_node().unwrap();
        assert_eq!(picked.node_id, "n2");
    }
}
