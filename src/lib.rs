//! chunkferry - a minimal distributed file-storage coordination layer.
//!
//! A coordinator tracks storage-node liveness and file-upload metadata;
//! storage nodes persist file chunks to local disk; every socket speaks
//! the same length-prefixed JSON-header frame protocol over TCP.
//!
//! Modules, leaves first:
//! - [`transport`]: the frame codec.
//! - [`protocol`]: the message envelope and typed payloads.
//! - [`registry`]: the coordinator's file and node registries + sweeper.
//! - [`store`]: per-node chunk persistence.
//! - [`server`]: the connection dispatcher and both server roles.
//! - [`client`]: typed clients and the upload orchestration.

pub mod client;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod store;
pub mod transport;
