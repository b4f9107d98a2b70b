//! Per-node persistence of chunk bytes, keyed by `(fileId, chunkIndex)`.

pub mod chunk_store;
pub mod error;

pub use chunk_store::ChunkStore;
pub use error::{StoreError, StoreResult};
