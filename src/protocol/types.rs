use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of protocol message tags.
///
/// The wire carries the tag as a free string; the dispatcher parses it into
/// this enum and routes unknown tags to its default (ERROR-producing) arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Welcome,
    Ping,
    Pong,
    FilesInitRequest,
    FilesInitResponse,
    FilesCommit,
    FilesCommitAck,
    NodeRegister,
    NodeRegisterAck,
    NodeHeartbeat,
    NodeHeartbeatAck,
    ChunkUpload,
    ChunkUploadAck,
    Quit,
    Goodbye,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Welcome => "WELCOME",
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::FilesInitRequest => "FILES_INIT_REQUEST",
            MessageType::FilesInitResponse => "FILES_INIT_RESPONSE",
            MessageType::FilesCommit => "FILES_COMMIT",
            MessageType::FilesCommitAck => "FILES_COMMIT_ACK",
            MessageType::NodeRegister => "NODE_REGISTER",
            MessageType::NodeRegisterAck => "NODE_REGISTER_ACK",
            MessageType::NodeHeartbeat => "NODE_HEARTBEAT",
            MessageType::NodeHeartbeatAck => "NODE_HEARTBEAT_ACK",
            MessageType::ChunkUpload => "CHUNK_UPLOAD",
            MessageType::ChunkUploadAck => "CHUNK_UPLOAD_ACK",
            MessageType::Quit => "QUIT",
            MessageType::Goodbye => "GOODBYE",
            MessageType::Error => "ERROR",
        }
    }
}

impl FromStr for MessageType {
    type Err = ();

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "WELCOME" => Ok(MessageType::Welcome),
            "PING" => Ok(MessageType::Ping),
            "PONG" => Ok(MessageType::Pong),
            "FILES_INIT_REQUEST" => Ok(MessageType::FilesInitRequest),
            "FILES_INIT_RESPONSE" => Ok(MessageType::FilesInitResponse),
            "FILES_COMMIT" => Ok(MessageType::FilesCommit),
            "FILES_COMMIT_ACK" => Ok(MessageType::FilesCommitAck),
            "NODE_REGISTER" => Ok(MessageType::NodeRegister),
            "NODE_REGISTER_ACK" => Ok(MessageType::NodeRegisterAck),
            "NODE_HEARTBEAT" => Ok(MessageType::NodeHeartbeat),
            "NODE_HEARTBEAT_ACK" => Ok(MessageType::NodeHeartbeatAck),
            "CHUNK_UPLOAD" => Ok(MessageType::ChunkUpload),
            "CHUNK_UPLOAD_ACK" => Ok(MessageType::ChunkUploadAck),
            "QUIT" => Ok(MessageType::Quit),
            "GOODBYE" => Ok(MessageType::Goodbye),
            "ERROR" => Ok(MessageType::Error),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The JSON header carried inside every frame.
///
/// `body_length` declares exactly how many raw bytes follow the header on
/// the wire (0 if none); the codec fills it in on write and reads exactly
/// that many bytes on receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(rename = "bodyLength", default)]
    pub body_length: i64,
}

impl Envelope {
    /// Header with a free-text `data` field (WELCOME, ERROR, PONG, ...).
    pub fn text(kind: MessageType, data: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            data: Some(data.into()),
            body_length: 0,
        }
    }

    /// Header with no `data` at all.
    pub fn bare(kind: MessageType) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            data: None,
            body_length: 0,
        }
    }

    /// Header whose `data` field is the JSON encoding of a typed payload.
    pub fn with_payload<T: Serialize>(kind: MessageType, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            kind: kind.as_str().to_string(),
            data: Some(serde_json::to_string(payload)?),
            body_length: 0,
        })
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.kind.parse().ok()
    }
}

// Payload schemas. Container-level `default` keeps absent fields tolerated
// on decode (zero / empty), leaving range checks to the handlers.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilesInitRequest {
    pub filename: String,
    pub total_size_bytes: i64,
    pub chunk_size_bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilesInitResponse {
    pub file_id: String,
    pub total_chunks: u32,
    pub chunk_size_bytes: i64,
    pub upload_host: String,
    pub upload_port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilesCommitRequest {
    pub file_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilesCommitAck {
    pub file_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeRegisterRequest {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub capacity_bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeRegisterAck {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeHeartbeat {
    pub node_id: String,
    pub timestamp_epoch_ms: i64,
    pub free_bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeHeartbeatAck {
    pub status: String,
    pub server_time_epoch_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkUploadRequest {
    pub file_id: String,
    pub chunk_index: i64,
    pub body_length: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkUploadAck {
    pub file_id: String,
    pub chunk_index: i64,
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PayloadError;

    #[test]
    fn envelope_uses_wire_field_names() {
        let env = Envelope::text(MessageType::Welcome, "hello");
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"type\":\"WELCOME\""));
        assert!(json.contains("\"bodyLength\":0"));
    }

    #[test]
    fn envelope_data_omitted_when_absent() {
        let env = Envelope::bare(MessageType::Ping);
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn envelope_tolerates_missing_fields() {
        let env: Envelope = serde_json::from_str("{\"type\":\"PING\"}").unwrap();
        assert_eq!(env.kind, "PING");
        assert_eq!(env.body_length, 0);
        assert!(env.data.is_none());
    }

    #[test]
    fn payload_round_trips_camel_case() {
        let req = FilesInitRequest {
            filename: "a.txt".into(),
            total_size_bytes: 8192,
            chunk_size_bytes: 4096,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"totalSizeBytes\":8192"));
        assert!(json.contains("\"chunkSizeBytes\":4096"));

        let back: FilesInitRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.filename, "a.txt");
    }

    #[test]
    fn payload_missing_fields_default_to_zero() {
        let req: FilesInitRequest = serde_json::from_str("{\"filename\":\"a\"}").unwrap();
        assert_eq!(req.total_size_bytes, 0);
        assert_eq!(req.chunk_size_bytes, 0);
    }

    #[test]
    fn message_type_tag_round_trip() {
        for kind in [
            MessageType::Welcome,
            MessageType::FilesInitRequest,
            MessageType::ChunkUploadAck,
            MessageType::Goodbye,
        ] {
            assert_eq!(kind.as_str().parse::<MessageType>(), Ok(kind));
        }
        assert!("BOGUS".parse::<MessageType>().is_err());
    }

    #[test]
    fn decode_payload_rejects_missing_and_bad_data() {
        let no_data = Envelope::bare(MessageType::FilesCommit);
        assert!(matches!(
            crate::protocol::decode_payload::<FilesCommitRequest>(&no_data),
            Err(PayloadError::MissingData)
        ));

        let bad = Envelope::text(MessageType::FilesCommit, "{not json");
        assert!(matches!(
            crate::protocol::decode_payload::<FilesCommitRequest>(&bad),
            Err(PayloadError::Json(_))
        ));
    }
}
