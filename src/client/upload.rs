use crate::client::coordinator::CoordinatorClient;
use crate::client::error::{ClientError, ClientResult};
use crate::client::node::NodeClient;
use std::net::SocketAddr;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

/// Outcome of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub file_id: String,
    pub total_chunks: u32,
    pub chunk_size_bytes: i64,
    pub node_addr: SocketAddr,
}

/// Runs the full upload sequence against a live coordinator:
/// FILES_INIT_REQUEST, one CHUNK_UPLOAD per planned chunk index to the
/// assigned node, then FILES_COMMIT.
///
/// The chunk plan is the coordinator's: exactly `totalChunks` chunks of
/// `chunkSizeBytes` each, indices `0..totalChunks`.
pub async fn upload_file(
    coordinator_addr: SocketAddr,
    path: &Path,
    chunk_size_bytes: i64,
) -> ClientResult<UploadReport> {
    let mut file = File::open(path).await?;
    let total_size_bytes = file.metadata().await?.len() as i64;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut coordinator = CoordinatorClient::connect(coordinator_addr).await?;
    let plan = coordinator
        .init_upload(&filename, total_size_bytes, chunk_size_bytes)
        .await?;

    // `uploadHost` may be a hostname rather than an IP literal.
    let node_addr: SocketAddr = tokio::net::lookup_host((plan.upload_host.as_str(), plan.upload_port))
        .await?
        .next()
        .ok_or_else(|| {
            ClientError::Rejected(format!(
                "coordinator returned unresolvable upload address {}:{}",
                plan.upload_host, plan.upload_port
            ))
        })?;

    tracing::info!(
        file_id = %plan.file_id,
        total_chunks = plan.total_chunks,
        %node_addr,
        "upload plan received"
    );

    let mut node = NodeClient::connect(node_addr).await?;
    let mut buf = vec![0u8; plan.chunk_size_bytes as usize];

    for chunk_index in 0..plan.total_chunks {
        let offset = chunk_index as u64 * plan.chunk_size_bytes as u64;
        file.seek(SeekFrom::Start(offset)).await?;

        let remaining = (total_size_bytes as u64).saturating_sub(offset);
        let len = (plan.chunk_size_bytes as u64).min(remaining) as usize;
        file.read_exact(&mut buf[..len]).await?;

        let ack = node
            .upload_chunk(&plan.file_id, chunk_index, &buf[..len])
            .await?;
        if ack.status != "OK" {
            return Err(ClientError::Rejected(format!(
                "chunk {chunk_index} rejected: {}",
                ack.message
            )));
        }
        tracing::debug!(chunk_index, len, "chunk acknowledged");
    }
    node.quit().await?;

    let ack = coordinator.commit(&plan.file_id).await?;
    if ack.status != "OK" {
        return Err(ClientError::Rejected(format!(
            "commit rejected: {}",
            ack.message
        )));
    }
    coordinator.quit().await?;

    Ok(UploadReport {
        file_id: plan.file_id,
        total_chunks: plan.total_chunks,
        chunk_size_bytes: plan.chunk_size_bytes,
        node_addr,
    })
}
