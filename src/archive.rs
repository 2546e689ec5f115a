//! Saving the converted archive with atomic `.part` file semantics.
//!
//! Bytes are streamed into `{name}.{call}.part` and renamed to `{name}` only
//! once the whole body has arrived. Each download numbers its own part file,
//! so overlapping downloads never share one. A part file that is never
//! committed is removed, whichever way the download ends.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::fs::FileSystem;

/// Returns the part path download number `call` writes before renaming to `path`.
#[must_use]
pub fn part_path(path: &Path, call: u64) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(format!(".{call}.part"));
    PathBuf::from(os)
}

/// A temporary archive file that is either committed or removed.
pub struct PartFile {
    part: PathBuf,
    target: PathBuf,
    file: Option<tokio::fs::File>,
    written: u64,
    released: bool,
}

impl PartFile {
    /// Creates `{target}.{call}.part`, truncating any leftover from an earlier run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub async fn create<F: FileSystem + ?Sized>(
        fs: &F,
        target: &Path,
        call: u64,
    ) -> std::io::Result<Self> {
        let part = part_path(target, call);
        let file = fs.create_file(&part).await?;
        Ok(Self {
            part,
            target: target.to_path_buf(),
            file: Some(file),
            written: 0,
            released: false,
        })
    }

    /// Appends a chunk of archive bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk).await?;
            self.written += chunk.len() as u64;
        }
        Ok(())
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.part
    }

    /// Flushes and renames the part file to its final name.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or renaming fails; the part file is then
    /// removed on drop.
    pub async fn commit<F: FileSystem + ?Sized>(mut self, fs: &F) -> std::io::Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        fs.rename(&self.part, &self.target).await?;
        self.released = true;
        Ok(self.target.clone())
    }

    /// Removes the part file.
    pub async fn discard<F: FileSystem + ?Sized>(mut self, fs: &F) {
        self.file.take();
        if let Err(e) = fs.remove_file(&self.part).await {
            log::warn!("Failed to remove {}: {e}", self.part.display());
        }
        self.released = true;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.released {
            // Reached when the download future is dropped or a commit step fails.
            // Drop cannot await, so this is a blocking remove.
            self.file.take();
            let _ = std::fs::remove_file(&self.part);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::TokioFileSystem;
    use tempfile::TempDir;

    #[test]
    fn part_path_appends_numbered_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/converted-images.zip"), 1),
            PathBuf::from("/tmp/converted-images.zip.1.part")
        );
        assert_ne!(
            part_path(Path::new("/tmp/converted-images.zip"), 1),
            part_path(Path::new("/tmp/converted-images.zip"), 2)
        );
    }

    #[tokio::test]
    async fn commit_renames_to_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("converted-images.zip");
        let fs = TokioFileSystem::new();

        let mut part = PartFile::create(&fs, &target, 1).await.unwrap();
        part.write(b"PK\x03\x04").await.unwrap();
        part.write(b"rest").await.unwrap();
        assert_eq!(part.written(), 8);

        let saved = part.commit(&fs).await.unwrap();
        assert_eq!(saved, target);
        assert_eq!(std::fs::read(&target).unwrap(), b"PK\x03\x04rest");
        assert!(!part_path(&target, 1).exists());
    }

    #[tokio::test]
    async fn discard_removes_part_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("converted-images.zip");
        let fs = TokioFileSystem::new();

        let mut part = PartFile::create(&fs, &target, 1).await.unwrap();
        part.write(b"partial").await.unwrap();
        assert!(part.path().exists());

        part.discard(&fs).await;
        assert!(!part_path(&target, 1).exists());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn drop_without_commit_removes_part_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("converted-images.zip");
        let fs = TokioFileSystem::new();

        {
            let mut part = PartFile::create(&fs, &target, 1).await.unwrap();
            part.write(b"partial").await.unwrap();
        }

        assert!(!part_path(&target, 1).exists());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn commit_replaces_existing_archive() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("converted-images.zip");
        std::fs::write(&target, b"old").unwrap();
        let fs = TokioFileSystem::new();

        let mut part = PartFile::create(&fs, &target, 1).await.unwrap();
        part.write(b"new").await.unwrap();
        part.commit(&fs).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn overlapping_part_files_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("converted-images.zip");
        let fs = TokioFileSystem::new();

        let mut first = PartFile::create(&fs, &target, 1).await.unwrap();
        let mut second = PartFile::create(&fs, &target, 2).await.unwrap();
        assert_ne!(first.path(), second.path());
        first.write(b"first").await.unwrap();
        second.write(b"second").await.unwrap();

        first.commit(&fs).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"first");
        assert!(part_path(&target, 2).exists());

        second.commit(&fs).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        assert!(!part_path(&target, 1).exists());
        assert!(!part_path(&target, 2).exists());
    }
}
