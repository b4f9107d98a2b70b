use crate::protocol::Envelope;
use crate::transport::error::{TransportError, TransportResult};
use bytes::Bytes;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Upper bound on the JSON header; real headers are a few hundred bytes.
const MAX_HEADER_BYTES: i32 = 64 * 1024;

/// Upper bound on a single frame's body.
const MAX_BODY_BYTES: i64 = 64 * 1024 * 1024;

/// Reads framed messages from a byte stream.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Blocks until a full frame is available.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly at a
    /// frame boundary. End-of-stream anywhere inside a frame is
    /// `TransportError::Truncated`.
    pub async fn read_frame(&mut self) -> TransportResult<Option<(Envelope, Option<Bytes>)>> {
        let mut len_buf = [0u8; 4];

        // A zero-byte first read is the normal "peer closed" signal;
        // anything shorter than 4 bytes after that is a broken frame.
        let n = self.inner.read(&mut len_buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if n < len_buf.len() {
            self.read_fully(&mut len_buf[n..]).await?;
        }

        let header_len = i32::from_be_bytes(len_buf);
        if header_len <= 0 || header_len > MAX_HEADER_BYTES {
            return Err(TransportError::InvalidHeaderLength(header_len));
        }

        let mut header_buf = vec![0u8; header_len as usize];
        self.read_fully(&mut header_buf).await?;

        // Without a parseable header there is no body length, so the
        // stream cannot be re-synchronized; the caller must close.
        let header: Envelope = serde_json::from_slice(&header_buf)?;

        let body_len = header.body_length;
        if body_len < 0 || body_len > MAX_BODY_BYTES {
            return Err(TransportError::InvalidBodyLength(body_len));
        }

        let body = if body_len > 0 {
            let mut body_buf = vec![0u8; body_len as usize];
            self.read_fully(&mut body_buf).await?;
            Some(Bytes::from(body_buf))
        } else {
            None
        };

        Ok(Some((header, body)))
    }

    async fn read_fully(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        self.inner.read_exact(buf).await.map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                TransportError::Truncated
            } else {
                TransportError::Io(e)
            }
        })?;
        Ok(())
    }
}

/// Writes framed messages to a byte stream.
pub struct FrameWriter<W> {
    inner: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
        }
    }

    /// Serializes the header, stamps `bodyLength`, and writes one complete
    /// frame followed by a flush.
    pub async fn write_frame(
        &mut self,
        mut header: Envelope,
        body: Option<&[u8]>,
    ) -> TransportResult<()> {
        header.body_length = body.map_or(0, |b| b.len() as i64);

        let header_bytes = serde_json::to_vec(&header)?;
        let header_len = header_bytes.len() as i32;

        self.inner.write_i32(header_len).await?;
        self.inner.write_all(&header_bytes).await?;
        if let Some(body) = body {
            self.inner.write_all(body).await?;
        }
        self.inner.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageType;
    use rand::RngCore;

    async fn round_trip(header: Envelope, body: Option<&[u8]>) -> (Envelope, Option<Bytes>) {
        let (client, server) = tokio::io::duplex(256 * 1024);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.write_frame(header, body).await.unwrap();
        reader.read_frame().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn round_trip_without_body() {
        let sent = Envelope::text(MessageType::Ping, "hello");
        let (header, body) = round_trip(sent.clone(), None).await;
        assert_eq!(header, sent);
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn round_trip_with_body() {
        let mut payload = vec![0u8; 64 * 1024];
        rand::thread_rng().fill_bytes(&mut payload);

        let sent = Envelope::text(MessageType::ChunkUpload, "{}");
        let (header, body) = round_trip(sent, Some(&payload)).await;

        assert_eq!(header.body_length, payload.len() as i64);
        assert_eq!(body.unwrap(), payload.as_slice());
    }

    #[tokio::test]
    async fn round_trip_with_empty_body() {
        let sent = Envelope::bare(MessageType::Quit);
        let (header, body) = round_trip(sent, Some(&[])).await;
        assert_eq!(header.body_length, 0);
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn clean_eof_returns_none() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);

        let mut reader = FrameReader::new(server);
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_non_positive_header_length() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_i32(-5).await.unwrap();
        client.flush().await.unwrap();

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_frame().await,
            Err(TransportError::InvalidHeaderLength(-5))
        ));
    }

    #[tokio::test]
    async fn eof_mid_header_is_truncated() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_i32(100).await.unwrap();
        client.write_all(b"partial").await.unwrap();
        client.flush().await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_frame().await,
            Err(TransportError::Truncated)
        ));
    }

    #[tokio::test]
    async fn eof_mid_body_is_truncated() {
        let (mut client, server) = tokio::io::duplex(1024);

        // Claim a 16-byte body but deliver only 4.
        let mut header = Envelope::bare(MessageType::ChunkUpload);
        header.body_length = 16;
        let header_bytes = serde_json::to_vec(&header).unwrap();

        client.write_i32(header_bytes.len() as i32).await.unwrap();
        client.write_all(&header_bytes).await.unwrap();
        client.write_all(&[1, 2, 3, 4]).await.unwrap();
        client.flush().await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_frame().await,
            Err(TransportError::Truncated)
        ));
    }

    #[tokio::test]
    async fn malformed_header_json_is_fatal() {
        let (mut client, server) = tokio::io::duplex(64);
        let junk = b"this is not json";
        client.write_i32(junk.len() as i32).await.unwrap();
        client.write_all(junk).await.unwrap();
        client.flush().await.unwrap();

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_frame().await,
            Err(TransportError::MalformedHeader(_))
        ));
    }
}
