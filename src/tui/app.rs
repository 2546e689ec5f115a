//! Application state model.

use std::path::PathBuf;
use std::time::Instant;

use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::{FileList, TransferClient};

use super::event::TransferEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Session,
    Help,
}

/// What the service reports for the current session.
#[derive(Debug, Default)]
pub struct RemoteView {
    pub files: Vec<String>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct App {
    pub popup: Popup,
    pub should_quit: bool,
    // Path input (top bar)
    pub path_input: String,
    // Local selection (main content)
    pub files: FileList,
    pub file_list_state: ListState,
    // Transfer
    pub client: TransferClient,
    /// Upload tasks spawned but not yet reported back.
    pub pending_uploads: usize,
    /// A conversion task is spawned but not yet reported back.
    pub pending_convert: bool,
    pub convert_started: Option<Instant>,
    pub archive_received: u64,
    pub last_archive: Option<PathBuf>,
    pub remote: RemoteView,
    // Status
    pub status: String,
    pub last_error: Option<String>,
    // Channels
    pub event_tx: mpsc::UnboundedSender<TransferEvent>,
}

impl App {
    pub fn new(client: TransferClient, event_tx: mpsc::UnboundedSender<TransferEvent>) -> Self {
        Self {
            popup: Popup::None,
            should_quit: false,
            path_input: String::new(),
            files: FileList::new(),
            file_list_state: ListState::default(),
            client,
            pending_uploads: 0,
            pending_convert: false,
            convert_started: None,
            archive_received: 0,
            last_archive: None,
            remote: RemoteView::default(),
            status: String::new(),
            last_error: None,
            event_tx,
        }
    }

    /// Busy flag for uploads, counting tasks the client has not picked up yet.
    pub fn is_uploading(&self) -> bool {
        self.pending_uploads > 0 || self.client.state().is_uploading()
    }

    /// Busy flag for conversions, counting a task the client has not picked up yet.
    pub fn is_converting(&self) -> bool {
        self.pending_convert || self.client.state().is_converting()
    }

    /// The convert action is disabled while either operation is running.
    pub fn convert_enabled(&self) -> bool {
        !self.is_uploading() && !self.is_converting()
    }

    /// Keeps the cursor on a valid row after the list shrank.
    pub fn clamp_selection(&mut self) {
        if self.files.is_empty() {
            self.file_list_state.select(None);
        } else if let Some(selected) = self.file_list_state.selected() {
            self.file_list_state
                .select(Some(selected.min(self.files.len() - 1)));
        } else {
            self.file_list_state.select(Some(0));
        }
    }

    /// Records a failure for the status line and the log.
    pub fn report_error(&mut self, message: String) {
        log::error!("{message}");
        self.status.clear();
        self.last_error = Some(message);
    }

    /// Records progress for the status line and clears any earlier error.
    pub fn report_status(&mut self, message: String) {
        log::info!("Status: {message}");
        self.last_error = None;
        self.status = message;
    }
}
