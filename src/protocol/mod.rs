//! Message envelope and typed request/response payloads.
//!
//! Every frame on the wire carries a JSON header (`Envelope`) whose `type`
//! tag selects behavior and whose `data` field holds a further JSON-encoded
//! payload specific to that type. The schemas here mirror the wire field
//! names exactly (camelCase).

pub mod error;
pub mod types;

pub use error::PayloadError;
pub use types::{
    ChunkUploadAck, ChunkUploadRequest, Envelope, FilesCommitAck, FilesCommitRequest,
    FilesInitRequest, FilesInitResponse, MessageType, NodeHeartbeat, NodeHeartbeatAck,
    NodeRegisterAck, NodeRegisterRequest,
};

use serde::de::DeserializeOwned;

/// Decode the envelope's `data` field into the payload type for the message
/// being handled.
pub fn decode_payload<T: DeserializeOwned>(header: &Envelope) -> Result<T, PayloadError> {
    let data = header
        .data
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or(PayloadError::MissingData)?;
    Ok(serde_json::from_str(data)?)
}
