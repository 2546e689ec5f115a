//! Transfer task management and event handling.
//!
//! Every network operation runs as its own tokio task and reports back through
//! the event channel; nothing is fired and forgotten.

use std::time::Instant;

use crate::{SelectedFile, UploadOutcome, format_bytes, format_duration};

use super::app::{App, Popup};
use super::event::TransferEvent;

/// Spawns an upload of exactly `batch`.
pub fn start_upload(app: &mut App, batch: Vec<SelectedFile>) {
    if batch.is_empty() {
        return;
    }
    let client = app.client.clone();
    let tx = app.event_tx.clone();
    let files = batch.len();

    app.pending_uploads += 1;
    app.report_status(format!("Uploading {files} file(s)..."));

    tokio::spawn(async move {
        let result = client.upload(&batch).await.map_err(|e| e.to_string());
        let _ = tx.send(TransferEvent::UploadFinished { files, result });
    });
}

/// Spawns convert-and-download unless an operation is already running.
pub fn start_convert(app: &mut App) {
    if !app.convert_enabled() {
        app.report_status("Wait for the current transfer to finish".to_string());
        return;
    }
    let client = app.client.clone();
    let tx = app.event_tx.clone();

    app.pending_convert = true;
    app.archive_received = 0;
    app.convert_started = Some(Instant::now());
    app.report_status("Converting and compressing...".to_string());

    tokio::spawn(async move {
        let result = client
            .convert_and_download()
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(TransferEvent::ConvertFinished { result });
    });
}

/// Opens the session popup and fetches the server-side file list.
pub fn start_list_remote(app: &mut App) {
    let client = app.client.clone();
    let tx = app.event_tx.clone();

    app.popup = Popup::Session;
    app.remote.loading = true;
    app.remote.error = None;

    tokio::spawn(async move {
        let result = client.list_remote_files().await.map_err(|e| e.to_string());
        let _ = tx.send(TransferEvent::RemoteFiles { result });
    });
}

/// Empties the server-side session, then refreshes the listing.
pub fn start_purge_remote(app: &mut App) {
    let client = app.client.clone();
    let tx = app.event_tx.clone();

    app.remote.loading = true;

    tokio::spawn(async move {
        let result = client.purge_remote_files().await.map_err(|e| e.to_string());
        let _ = tx.send(TransferEvent::Purged { result });
    });
}

pub fn handle_transfer_event(app: &mut App, event: TransferEvent) {
    match event {
        TransferEvent::UploadStarted { files, bytes } => {
            app.report_status(format!(
                "Uploading {files} file(s), {}...",
                format_bytes(bytes)
            ));
        }
        TransferEvent::UploadFinished { files, result } => {
            app.pending_uploads = app.pending_uploads.saturating_sub(1);
            match result {
                Ok(UploadOutcome::Accepted(session)) => {
                    app.report_status(format!("Uploaded {files} file(s) (session {session})"));
                }
                Ok(UploadOutcome::Skipped) => {}
                Err(e) => app.report_error(format!("Upload failed: {e}")),
            }
        }
        TransferEvent::ArchiveProgress { bytes_delta } => {
            app.archive_received = app.archive_received.saturating_add(bytes_delta);
        }
        TransferEvent::ConvertFinished { result } => {
            app.pending_convert = false;
            let elapsed = app.convert_started.take().map(|t| t.elapsed());
            match result {
                Ok(path) => {
                    let took = elapsed.map(format_duration).unwrap_or_default();
                    app.report_status(format!(
                        "Saved {} ({}) in {took}",
                        path.display(),
                        format_bytes(app.archive_received)
                    ));
                    app.last_archive = Some(path);
                }
                Err(e) => app.report_error(format!("Conversion failed: {e}")),
            }
        }
        TransferEvent::RemoteFiles { result } => {
            app.remote.loading = false;
            match result {
                Ok(files) => {
                    app.remote.files = files;
                    app.remote.error = None;
                }
                Err(e) => {
                    log::error!("Listing session files failed: {e}");
                    app.remote.files.clear();
                    app.remote.error = Some(e);
                }
            }
        }
        TransferEvent::Purged { result } => match result {
            Ok(()) => {
                app.report_status("Server-side session emptied".to_string());
                start_list_remote(app);
            }
            Err(e) => {
                app.remote.loading = false;
                app.remote.error = Some(e.clone());
                app.report_error(format!("Purge failed: {e}"));
            }
        },
    }
}
