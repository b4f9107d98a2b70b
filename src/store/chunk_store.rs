use crate::store::error::{StoreError, StoreResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Writes chunk bytes to local disk and loads them back.
///
/// Layout: `<base_dir>/chunks/<fileId>/<chunkIndex>.bin`. Writing the same
/// key twice overwrites.
pub struct ChunkStore {
    base_dir: PathBuf,
    chunks_dir: PathBuf,
}

impl ChunkStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let chunks_dir = base_dir.join("chunks");
        Self {
            base_dir,
            chunks_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Persists one chunk, creating any needed directories.
    pub async fn write_chunk(&self, file_id: &str, chunk_index: u32, data: &[u8]) -> StoreResult<()> {
        let file_dir = self.file_dir(file_id)?;
        fs::create_dir_all(&file_dir).await?;

        let chunk_path = file_dir.join(format!("{chunk_index}.bin"));
        fs::write(&chunk_path, data).await?;
        Ok(())
    }

    pub async fn read_chunk(&self, file_id: &str, chunk_index: u32) -> StoreResult<Vec<u8>> {
        let chunk_path = self.file_dir(file_id)?.join(format!("{chunk_index}.bin"));
        Ok(fs::read(&chunk_path).await?)
    }

    pub async fn chunk_exists(&self, file_id: &str, chunk_index: u32) -> bool {
        match self.file_dir(file_id) {
            Ok(dir) => fs::try_exists(dir.join(format!("{chunk_index}.bin")))
                .await
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// File ids come off the wire; anything that could escape the chunks
    /// directory is rejected before touching the filesystem.
    fn file_dir(&self, file_id: &str) -> StoreResult<PathBuf> {
        if file_id.trim().is_empty() {
            return Err(StoreError::InvalidKey("fileId is blank".to_string()));
        }
        if file_id.contains('/') || file_id.contains('\\') || file_id.contains("..") {
            return Err(StoreError::InvalidKey(format!(
                "fileId contains path separators: {file_id}"
            )));
        }
        Ok(self.chunks_dir.join(file_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());

        store.write_chunk("file-1", 0, b"hello chunks").await.unwrap();

        assert!(store.chunk_exists("file-1", 0).await);
        assert!(!store.chunk_exists("file-1", 1).await);
        assert_eq!(store.read_chunk("file-1", 0).await.unwrap(), b"hello chunks");
    }

    #[tokio::test]
    async fn rewrite_overwrites_existing_chunk() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());

        store.write_chunk("file-1", 3, b"first").await.unwrap();
        store.write_chunk("file-1", 3, b"second").await.unwrap();

        assert_eq!(store.read_chunk("file-1", 3).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn chunks_of_one_file_are_kept_apart() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());

        store.write_chunk("file-1", 0, b"zero").await.unwrap();
        store.write_chunk("file-1", 1, b"one").await.unwrap();

        assert_eq!(store.read_chunk("file-1", 0).await.unwrap(), b"zero");
        assert_eq!(store.read_chunk("file-1", 1).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn rejects_blank_and_traversal_file_ids() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());

        for bad in ["", "  ", "../escape", "a/b", "a\\b"] {
            assert!(matches!(
                store.write_chunk(bad, 0, b"x").await,
                Err(StoreError::InvalidKey(_))
            ));
            assert!(!store.chunk_exists(bad, 0).await);
        }
    }

    #[tokio::test]
    async fn read_missing_chunk_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());

        assert!(matches!(
            store.read_chunk("file-1", 9).await,
            Err(StoreError::Io(_))
        ));
    }
}
