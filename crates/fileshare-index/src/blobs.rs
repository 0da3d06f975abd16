//! Directory-backed blob store
//!
//! Blob files live one level under the root, named exactly by their
//! identifier with no extension. All metadata lives in the record store.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Byte storage under a single root directory, keyed by identifier.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory and any missing parents. Idempotent.
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// The path a blob with this identifier is (or would be) stored at.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Stream `content` into a new blob. Returns the number of bytes written.
    pub async fn write<R>(&self, id: &str, content: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut file = fs::File::create(self.path_for(id)).await?;
        let written = tokio::io::copy(content, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }

    pub async fn read(&self, id: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(id)).await
    }

    pub async fn exists(&self, id: &str) -> io::Result<bool> {
        fs::try_exists(self.path_for(id)).await
    }

    pub async fn remove(&self, id: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(id)).await
    }

    /// Names of all blob files directly under the root. The root itself and
    /// any subdirectories are skipped. Order is unspecified.
    pub async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}
