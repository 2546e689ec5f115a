//! File system seam used by the transfer client.

use async_trait::async_trait;
use std::path::Path;

/// The file operations needed to read uploads and save archives.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Reads the whole file into memory.
    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Creates (or truncates) a file at the given path.
    async fn create_file(&self, path: &Path) -> std::io::Result<tokio::fs::File>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    async fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;
}

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn create_file(&self, path: &Path) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::create(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
