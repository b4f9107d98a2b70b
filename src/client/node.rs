use crate::client::error::{ClientError, ClientResult};
use crate::protocol::{self, ChunkUploadAck, ChunkUploadRequest, Envelope, MessageType};
use crate::transport::{FrameReader, FrameWriter};
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Client side of a storage-node data-plane connection.
pub struct NodeClient {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl NodeClient {
    /// Connects and consumes the node's WELCOME frame.
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
        self.writer
            .write_frame(Envelope::text(MessageType::Ping, ""), None)
            .await?;
        let (reply, _) = self.read_reply().await?;
        match reply.message_type() {
            Some(MessageType::Pong) => Ok(reply.data.unwrap_or_default()),
            _ => Err(ClientError::UnexpectedReply {
                expected: "PONG",
                got: reply.kind,
            }),
        }
    }

    /// Uploads one chunk: the raw bytes travel as the frame body, and the
    /// payload declares their length for the node to cross-check.
    pub async fn upload_chunk(
        &mut self,
        file_id: &str,
        chunk_index: u32,
        data: &[u8],
    ) -> ClientResult<ChunkUploadAck> {
        let request = ChunkUploadRequest {
            file_id: file_id.to_string(),
            chunk_index: chunk_index as i64,
            body_length: data.len() as i64,
        };
        let envelope = Envelope::with_payload(MessageType::ChunkUpload, &request)
            .map_err(crate::protocol::PayloadError::from)?;

        self.writer.write_frame(envelope, Some(data)).await?;
        let (reply, _) = self.read_reply().await?;

        match reply.message_type() {
            Some(MessageType::ChunkUploadAck) => Ok(protocol::decode_payload(&reply)?),
            Some(MessageType::Error) => {
                Err(ClientError::Rejected(reply.data.unwrap_or_default()))
            }
            _ => Err(ClientError::UnexpectedReply {
                expected: "CHUNK_UPLOAD_ACK",
                got: reply.kind,
            }),
        }
    }

    /// QUIT/GOODBYE handshake; the node closes after replying.
    pub async fn quit(mut self) -> ClientResult<()> {
        self.writer
            .write_frame(Envelope::text(MessageType::Quit, "bye"), None)
            .await?;
        let (reply, _) = self.read_reply().await?;
        match reply.message_type() {
            Some(MessageType::Goodbye) => Ok(()),
            _ => Err(ClientError::UnexpectedReply {
                expected: "GOODBYE",
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
