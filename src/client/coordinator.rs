use crate::client::error::{ClientError, ClientResult};
use crate::protocol::{
    self, Envelope, FilesCommitAck, FilesCommitRequest, FilesInitRequest, FilesInitResponse,
    MessageType, NodeHeartbeat, NodeHeartbeatAck, NodeRegisterAck, NodeRegisterRequest,
};
use crate::transport::{FrameReader, FrameWriter};
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Client side of a coordinator control-plane connection.
///
/// Requests and replies are strictly paired: every method writes one frame
/// and reads exactly one reply.
pub struct CoordinatorClient {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl CoordinatorClient {
    /// Connects and consumes the server's WELCOME frame.
    pub async fn connect(addr: SocketAddr) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        let mut client = Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
        };

        let (welcome, _) = client.read_reply().await?;
        if welcome.message_type() != Some(MessageType::Welcome) {
            return Err(ClientError::UnexpectedReply {
                expected: "WELCOME",
                got: welcome.kind,
            });
        }
        Ok(client)
    }

    pub async fn ping(&mut self) -> ClientResult<String> {
        let reply = self
            .request(Envelope::text(MessageType::Ping, ""), MessageType::Pong)
            .await?;
        Ok(reply.data.unwrap_or_default())
    }

    /// Phase one of an upload: create the file record and learn which node
    /// to stream chunks to.
    pub async fn init_upload(
        &mut self,
        filename: &str,
        total_size_bytes: i64,
        chunk_size_bytes: i64,
    ) -> ClientResult<FilesInitResponse> {
        let request = FilesInitRequest {
            filename: filename.to_string(),
            total_size_bytes,
            chunk_size_bytes,
        };
        let envelope = Envelope::with_payload(MessageType::FilesInitRequest, &request)
            .map_err(crate::protocol::PayloadError::from)?;
        let reply = self
            .request(envelope, MessageType::FilesInitResponse)
            .await?;
        Ok(protocol::decode_payload(&reply)?)
    }

    /// Final phase: assert that all chunks were uploaded.
    pub async fn commit(&mut self, file_id: &str) -> ClientResult<FilesCommitAck> {
        let request = FilesCommitRequest {
            file_id: file_id.to_string(),
        };
        let envelope = Envelope::with_payload(MessageType::FilesCommit, &request)
            .map_err(crate::protocol::PayloadError::from)?;
        let reply = self.request(envelope, MessageType::FilesCommitAck).await?;
        Ok(protocol::decode_payload(&reply)?)
    }

    pub async fn register_node(
        &mut self,
        request: &NodeRegisterRequest,
    ) -> ClientResult<NodeRegisterAck> {
        let envelope = Envelope::with_payload(MessageType::NodeRegister, request)
            .map_err(crate::protocol::PayloadError::from)?;
        let reply = self.request(envelope, MessageType::NodeRegisterAck).await?;
        Ok(protocol::decode_payload(&reply)?)
    }

    pub async fn heartbeat(&mut self, heartbeat: &NodeHeartbeat) -> ClientResult<NodeHeartbeatAck> {
        let envelope = Envelope::with_payload(MessageType::NodeHeartbeat, heartbeat)
            .map_err(crate::protocol::PayloadError::from)?;
        let reply = self
            .request(envelope, MessageType::NodeHeartbeatAck)
            .await?;
        Ok(protocol::decode_payload(&reply)?)
    }

    /// QUIT/GOODBYE handshake; the server closes after replying.
    pub async fn quit(mut self) -> ClientResult<()> {
        self.request(
            Envelope::text(MessageType::Quit, "bye"),
            MessageType::Goodbye,
        )
        .await?;
        Ok(())
    }

    async fn request(&mut self, envelope: Envelope, expect: MessageType) -> ClientResult<Envelope> {
        self.writer.write_frame(envelope, None).await?;
        let (reply, _) = self.read_reply().await?;

        match reply.message_type() {
            Some(kind) if kind == expect => Ok(reply),
            Some(MessageType::Error) => {
                Err(ClientError::Rejected(reply.data.unwrap_or_default()))
            }
            _ => Err(ClientError::UnexpectedReply {
                expected: expect.as_str(),
                got: reply.kind,
            }),
        }
    }

    async fn read_reply(&mut self) -> ClientResult<(Envelope, Option<bytes::Bytes>)> {
        self.reader
            .read_frame()
            .await?
            .ok_or(ClientError::ConnectionClosed)
    }
}
