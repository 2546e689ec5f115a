//! The ordered list of files the user has picked locally.
//!
//! Nothing here touches the network. Adding files hands back the new batch so
//! the caller can upload exactly those; removing or clearing never affects the
//! server-side session.

use std::path::{Path, PathBuf};

/// A locally held file plus the name shown to the user and sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Where the file lives on disk.
    pub path: PathBuf,
    /// Display name (the path's final component).
    pub name: String,
    /// Size in bytes observed when the file was selected.
    pub size: u64,
}

impl SelectedFile {
    /// Builds a handle without touching the file system.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self { path, name, size }
    }

    /// Builds a handle for an existing regular file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be stat'ed or is not a regular file.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(Self::new(path, metadata.len()))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    )
}

/// Ordered sequence of selected files. Identity is positional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList {
    files: Vec<SelectedFile>,
}

impl FileList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Appends `files` after the existing entries and returns the newly added batch.
    ///
    /// No type or size validation happens here; the remote service decides.
    pub fn add(&mut self, files: impl IntoIterator<Item = SelectedFile>) -> Vec<SelectedFile> {
        let start = self.files.len();
        self.files.extend(files);
        self.files[start..].to_vec()
    }

    /// Removes the entry at `index`. Out-of-range indices are ignored.
    pub fn remove_at(&mut self, index: usize) -> Option<SelectedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SelectedFile> {
        self.files.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectedFile> {
        self.files.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SelectedFile] {
        &self.files
    }

    /// Sum of the sizes of all selected files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a SelectedFile;
    type IntoIter = std::slice::Iter<'a, SelectedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
