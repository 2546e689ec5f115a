//! Transfer event types and the TUI progress adapter.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::{TransferProgress, UploadOutcome};

/// Results sent from transfer tasks back to the UI loop.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    UploadStarted {
        files: usize,
        bytes: u64,
    },
    UploadFinished {
        files: usize,
        result: Result<UploadOutcome, String>,
    },
    ArchiveProgress {
        bytes_delta: u64,
    },
    ConvertFinished {
        result: Result<PathBuf, String>,
    },
    RemoteFiles {
        result: Result<Vec<String>, String>,
    },
    Purged {
        result: Result<(), String>,
    },
}

pub struct TuiProgress {
    pub tx: mpsc::UnboundedSender<TransferEvent>,
}

impl TransferProgress for TuiProgress {
    fn on_upload_started(&self, files: usize, bytes: u64) {
        let _ = self.tx.send(TransferEvent::UploadStarted { files, bytes });
    }

    fn on_archive_chunk(&self, bytes_delta: u64) {
        let _ = self.tx.send(TransferEvent::ArchiveProgress { bytes_delta });
    }
}
