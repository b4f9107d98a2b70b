//! Coordinator-owned registries for file metadata and node liveness.
//!
//! A single `Registry` is constructed at coordinator startup and shared by
//! handle with every connection task and the background sweeper; per-key
//! operations are atomic, and no operation spans both maps.

pub mod registry;
pub mod sweeper;
pub mod types;

pub use registry::{Registry, DEFAULT_HEARTBEAT_TIMEOUT};
pub use sweeper::{spawn_sweeper, DEFAULT_SWEEP_INTERVAL};
pub use types::{FileMetadata, FileStatus, NodeInfo, NodeStatus};
