//! luna-convert - Client for a session-based image-to-WebP conversion service.
//!
//! Files are picked into a [`FileList`], uploaded in batches (the service
//! answers with a session identifier), then converted server-side and saved
//! locally as a single zip archive.
//!
//! # Example
//!
//! ```no_run
//! use luna_convert::{ClientConfig, SelectedFile, TransferClient, UploadOutcome};
//!
//! # async fn example() -> luna_convert::Result<()> {
//! let client = TransferClient::new(ClientConfig::load()?)?;
//!
//! let batch = vec![SelectedFile::from_path("photos/cat.png")?];
//! if let UploadOutcome::Accepted(session) = client.upload(&batch).await? {
//!     println!("Uploaded into session {session}");
//! }
//!
//! let archive = client.convert_and_download().await?;
//! println!("Saved {}", archive.display());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod archive;
pub mod config;
pub mod error;
pub mod format;
pub mod fs;
pub mod paths;
pub mod selection;
pub mod state;
pub mod transfer;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use format::{format_bytes, format_duration};
pub use fs::{FileSystem, TokioFileSystem};
pub use paths::extract_paths;
pub use selection::{FileList, SelectedFile};
pub use state::{SessionId, SharedContext, TransferContext, TransferPhase};
pub use transfer::{NoProgress, TransferClient, TransferProgress, UploadOutcome};
