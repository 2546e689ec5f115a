//! Upload, convert and download against the remote conversion service.
//!
//! The client owns the session cell and the two busy flags (through a
//! [`SharedContext`]). Every operation that raises a flag holds a
//! guard which lowers it again on every exit path, including
//! errors, panics and dropped futures.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::archive::PartFile;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::selection::SelectedFile;
use crate::state::{SessionId, SharedContext, StateEvent, TransferContext};

pub const UPLOAD_PATH: &str = "/upload";
pub const CONVERT_PATH: &str = "/convert-and-zip";
pub const LIST_FILES_PATH: &str = "/list-files";
pub const PURGE_PATH: &str = "/delete-all";

/// Multipart field name used for every uploaded file.
pub const UPLOAD_FIELD: &str = "files";

/// Trait for receiving transfer progress updates.
///
/// All methods have default no-op implementations for convenience.
pub trait TransferProgress: Send + Sync {
    /// Called once the upload payload is assembled, before it is sent.
    fn on_upload_started(&self, _files: usize, _bytes: u64) {}

    /// Called for every chunk of archive bytes received.
    fn on_archive_chunk(&self, _bytes_delta: u64) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TransferProgress for NoProgress {}

/// What happened to an upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Nothing to upload; no request was made.
    Skipped,
    /// The returned session replaced the stored one.
    Accepted(SessionId),
}

#[derive(Deserialize)]
struct UploadResponse {
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    session_id: &'a str,
}

#[derive(Deserialize)]
struct ListFilesResponse {
    files: Vec<String>,
}

/// Builds a configured HTTP client for the conversion service.
///
/// No request timeout is set: a conversion may legitimately take a long time.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// Lowers a busy flag when dropped unless the operation finished normally.
struct OperationGuard<'a> {
    state: &'a SharedContext,
    on_abort: Option<StateEvent>,
}

impl<'a> OperationGuard<'a> {
    const fn new(state: &'a SharedContext, on_abort: StateEvent) -> Self {
        Self {
            state,
            on_abort: Some(on_abort),
        }
    }

    fn finish(mut self, event: &StateEvent) -> Result<(TransferContext, TransferContext)> {
        self.on_abort = None;
        self.state.apply(event)
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.on_abort.take()
            && let Err(e) = self.state.apply(&event)
        {
            log::error!("Failed to restore transfer state: {e}");
        }
    }
}

/// Session-bound client for the conversion service.
pub struct TransferClient<F: FileSystem = TokioFileSystem> {
    http: reqwest::Client,
    config: ClientConfig,
    fs: Arc<F>,
    state: SharedContext,
    progress: Arc<dyn TransferProgress>,
}

impl<F: FileSystem> Clone for TransferClient<F> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            fs: Arc::clone(&self.fs),
            state: self.state.clone(),
            progress: Arc::clone(&self.progress),
        }
    }
}

impl TransferClient<TokioFileSystem> {
    /// Creates a client with a freshly built HTTP client and the default file system.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_http(build_http_client()?, config))
    }

    /// Creates a client around an existing HTTP client.
    #[must_use]
    pub fn with_http(http: reqwest::Client, config: ClientConfig) -> Self {
        Self::with_fs(http, config, TokioFileSystem)
    }
}

impl<F: FileSystem> TransferClient<F> {
    /// Creates a client with a custom file system implementation.
    #[must_use]
    pub fn with_fs(http: reqwest::Client, config: ClientConfig, fs: F) -> Self {
        Self {
            http,
            config,
            fs: Arc::new(fs),
            state: SharedContext::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Replaces the progress receiver.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn TransferProgress>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of the session cell and busy flags.
    #[must_use]
    pub fn state(&self) -> TransferContext {
        self.state.snapshot()
    }

    /// The shared state container, for observers that outlive a snapshot.
    #[must_use]
    pub const fn shared_state(&self) -> &SharedContext {
        &self.state
    }

    /// The current session, if any upload has succeeded.
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        self.state.snapshot().session().cloned()
    }

    /// Uploads `files` as one multipart request and stores the returned session.
    ///
    /// An empty slice is a no-op. On failure the stored session is untouched.
    /// When uploads overlap, the one that completes last sets the session.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read, the request fails, the
    /// service rejects it, or the body has no `session_id`.
    pub async fn upload(&self, files: &[SelectedFile]) -> Result<UploadOutcome> {
        if files.is_empty() {
            log::debug!("Upload skipped: no files");
            return Ok(UploadOutcome::Skipped);
        }

        self.state.apply(&StateEvent::UploadStarted)?;
        let guard = OperationGuard::new(&self.state, StateEvent::UploadFailed);
        log::info!("Uploading {} file(s)", files.len());

        let session = match self.send_upload(files).await {
            Ok(session) => session,
            Err(e) => {
                log::error!("Upload failed: {e}");
                return Err(e);
            }
        };

        let (before, _) = guard.finish(&StateEvent::UploadSucceeded {
            session: session.clone(),
        })?;
        if let Some(previous) = before.session().filter(|previous| **previous != session) {
            log::info!("Upload complete, session {session} replaces {previous}");
        } else {
            log::info!("Upload complete, session {session}");
        }
        Ok(UploadOutcome::Accepted(session))
    }

    async fn send_upload(&self, files: &[SelectedFile]) -> Result<SessionId> {
        let mut form = Form::new();
        let mut total_bytes = 0u64;
        for file in files {
            let bytes = self.fs.read_file(&file.path).await?;
            total_bytes += bytes.len() as u64;
            let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
            form = form.part(UPLOAD_FIELD, file_part(bytes, &file.name, mime.essence_str())?);
        }
        self.progress.on_upload_started(files.len(), total_bytes);

        let response = self
            .http
            .post(self.config.endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        let body = check_status(response, UPLOAD_PATH)?.bytes().await?;

        let parsed: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::malformed(UPLOAD_PATH, e.to_string()))?;
        match parsed.session_id {
            Some(id) if !id.trim().is_empty() => Ok(SessionId::new(id)),
            _ => Err(Error::malformed(UPLOAD_PATH, "missing session_id")),
        }
    }

    /// Converts every file in the current session and saves the archive.
    ///
    /// Returns the path the archive was saved to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without any network traffic when no upload
    /// has succeeded yet; otherwise any transport, status, body or I/O error.
    pub async fn convert_and_download(&self) -> Result<PathBuf> {
        let (_, started) = self
            .state
            .apply(&StateEvent::ConvertStarted)
            .inspect_err(|e| log::error!("Conversion not started: {e}"))?;
        let guard = OperationGuard::new(&self.state, StateEvent::ConvertFailed);
        let session = started.session().cloned().ok_or(Error::NoSession)?;
        let call = started.converts_issued();
        log::info!("Converting session {session} (download #{call})");

        match self.fetch_archive(&session, call).await {
            Ok(path) => {
                guard.finish(&StateEvent::ConvertSucceeded)?;
                log::info!("Archive saved to {}", path.display());
                Ok(path)
            }
            Err(e) => {
                log::error!("Conversion failed: {e}");
                Err(e)
            }
        }
    }

    async fn fetch_archive(&self, session: &SessionId, call: u64) -> Result<PathBuf> {
        let response = self
            .http
            .post(self.config.endpoint(CONVERT_PATH))
            .json(&ConvertRequest {
                session_id: session.as_str(),
            })
            .send()
            .await?;
        let response = check_status(response, CONVERT_PATH)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if is_json_content_type(content_type) {
            return Err(Error::malformed(
                CONVERT_PATH,
                "expected an archive, got JSON",
            ));
        }

        if !self.config.download_dir.as_os_str().is_empty() {
            self.fs.create_dir_all(&self.config.download_dir).await?;
        }
        let mut part =
            PartFile::create(self.fs.as_ref(), &self.config.archive_path(), call).await?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let written = match chunk {
                Ok(chunk) => part.write(&chunk).await.map(|()| chunk.len() as u64),
                Err(e) => {
                    part.discard(self.fs.as_ref()).await;
                    return Err(e.into());
                }
            };
            match written {
                Ok(delta) => self.progress.on_archive_chunk(delta),
                Err(e) => {
                    part.discard(self.fs.as_ref()).await;
                    return Err(e.into());
                }
            }
        }

        if part.written() == 0 {
            part.discard(self.fs.as_ref()).await;
            return Err(Error::malformed(CONVERT_PATH, "empty archive"));
        }
        Ok(part.commit(self.fs.as_ref()).await?)
    }

    /// Lists the file names the service holds for the current session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] when no upload has succeeded, or any
    /// transport, status or body error.
    pub async fn list_remote_files(&self) -> Result<Vec<String>> {
        let session = self.session().ok_or(Error::NoSession)?;
        let response = self
            .http
            .get(self.config.endpoint(LIST_FILES_PATH))
            .query(&[("session_id", session.as_str())])
            .send()
            .await?;
        let body = check_status(response, LIST_FILES_PATH)?.bytes().await?;
        let parsed: ListFilesResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::malformed(LIST_FILES_PATH, e.to_string()))?;
        Ok(parsed.files)
    }

    /// Empties the server-side session. Local selection and the stored
    /// session id are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] when no upload has succeeded, or any
    /// transport or status error.
    pub async fn purge_remote_files(&self) -> Result<()> {
        let session = self.session().ok_or(Error::NoSession)?;
        let response = self
            .http
            .post(self.config.endpoint(PURGE_PATH))
            .query(&[("session_id", session.as_str())])
            .send()
            .await?;
        check_status(response, PURGE_PATH)?;
        log::info!("Purged server-side files for session {session}");
        Ok(())
    }
}

/// One multipart file part. A content type reqwest cannot parse is a local
/// input problem, not a transport failure.
fn file_part(bytes: Vec<u8>, name: &str, content_type: &str) -> Result<Part> {
    Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_str(content_type)
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{name}: invalid content type {content_type:?}: {e}"),
            ))
        })
}

fn check_status(response: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Rejected {
            endpoint,
            status: status.as_u16(),
        })
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_types_detected() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(is_json_content_type("Application/JSON"));
    }

    #[test]
    fn archive_content_types_accepted() {
        assert!(!is_json_content_type("application/zip"));
        assert!(!is_json_content_type("application/octet-stream"));
        assert!(!is_json_content_type(""));
    }

    #[test]
    fn convert_request_serializes_session_id_only() {
        let body = serde_json::to_string(&ConvertRequest {
            session_id: "abc123",
        })
        .unwrap();
        assert_eq!(body, r#"{"session_id":"abc123"}"#);
    }

    #[test]
    fn upload_response_ignores_extra_fields() {
        let parsed: UploadResponse =
            serde_json::from_str(r#"{"message":"stored","session_id":"abc"}"#).unwrap();
        assert_eq!(parsed.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn new_client_starts_idle() {
        let client = TransferClient::new(ClientConfig::default()).unwrap();
        assert!(client.session().is_none());
        assert!(!client.state().is_uploading());
        assert!(!client.state().is_converting());
    }

    #[tokio::test]
    async fn empty_upload_is_skipped() {
        let client = TransferClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.upload(&[]).await.unwrap(), UploadOutcome::Skipped);
        assert_eq!(client.state(), TransferContext::new());
    }

    #[tokio::test]
    async fn convert_without_session_fails_fast() {
        let client = TransferClient::new(ClientConfig::default()).unwrap();
        let err = client.convert_and_download().await.unwrap_err();
        assert!(matches!(err, Error::NoSession));
        assert!(!client.state().is_converting());
    }

    struct UnreadableFs;

    #[async_trait::async_trait]
    impl FileSystem for UnreadableFs {
        async fn read_file(&self, path: &std::path::Path) -> std::io::Result<Vec<u8>> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is not readable", path.display()),
            ))
        }
        async fn create_dir_all(&self, _path: &std::path::Path) -> std::io::Result<()> {
            Ok(())
        }
        async fn create_file(&self, path: &std::path::Path) -> std::io::Result<tokio::fs::File> {
            tokio::fs::File::create(path).await
        }
        async fn rename(&self, _from: &std::path::Path, _to: &std::path::Path) -> std::io::Result<()> {
            Ok(())
        }
        async fn remove_file(&self, _path: &std::path::Path) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unreadable_file_fails_upload_before_any_request() {
        let config = ClientConfig::new().with_base_url("http://127.0.0.1:9");
        let client = TransferClient::with_fs(reqwest::Client::new(), config, UnreadableFs);
        let err = client
            .upload(&[SelectedFile::new("/photos/locked.png", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::PermissionDenied));
        assert!(client.session().is_none());
        assert!(!client.state().is_uploading());
    }

    #[test]
    fn file_part_accepts_guessed_types() {
        assert!(file_part(b"\x89PNG".to_vec(), "cat.png", "image/png").is_ok());
        assert!(file_part(Vec::new(), "blob", "application/octet-stream").is_ok());
    }

    #[test]
    fn file_part_reports_bad_content_type_as_local_error() {
        let err = file_part(b"x".to_vec(), "odd.img", "not a mime").unwrap_err();
        assert!(
            matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::InvalidInput),
            "unexpected error: {err:?}"
        );
        assert!(!matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn guard_restores_flag_when_future_is_dropped() {
        let state = SharedContext::new();
        state.apply(&StateEvent::UploadStarted).unwrap();
        {
            let _guard = OperationGuard::new(&state, StateEvent::UploadFailed);
            assert!(state.snapshot().is_uploading());
        }
        assert!(!state.snapshot().is_uploading());
    }
}
