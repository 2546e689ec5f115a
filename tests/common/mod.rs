#![allow(dead_code)]

//! In-process fake of the conversion service, served on a loopback port.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::sync::Notify;

use luna_convert::{ClientConfig, SelectedFile, TransferClient};

/// Minimal valid zip: an empty end-of-central-directory record.
pub const EMPTY_ZIP: &[u8] = &[
    0x50, 0x4b, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// How `/upload` answers.
#[derive(Debug, Clone)]
pub enum UploadReply {
    Session(String),
    Status(StatusCode),
    Body(&'static str),
}

/// How `/convert-and-zip` answers.
#[derive(Debug, Clone)]
pub enum ConvertReply {
    Archive(Vec<u8>),
    Json(&'static str),
    Status(StatusCode),
}

/// One file part received by `/upload`.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Default)]
pub struct Hits {
    pub upload: AtomicUsize,
    pub convert: AtomicUsize,
    pub list: AtomicUsize,
    pub purge: AtomicUsize,
}

pub struct FakeState {
    pub hits: Hits,
    pub upload_replies: Mutex<Vec<UploadReply>>,
    pub convert_reply: Mutex<ConvertReply>,
    pub uploads: Mutex<Vec<Vec<ReceivedPart>>>,
    pub convert_bodies: Mutex<Vec<serde_json::Value>>,
    pub session_queries: Mutex<Vec<String>>,
    pub remote_files: Mutex<Vec<String>>,
    /// When set, `/upload` and `/convert-and-zip` wait here before answering.
    pub gate: Mutex<Option<Arc<Notify>>>,
    /// Signalled each time a gated handler starts waiting.
    pub entered: Notify,
    pub entered_count: AtomicUsize,
}

impl FakeState {
    fn next_upload_reply(&self) -> UploadReply {
        let mut replies = self.upload_replies.lock().unwrap();
        if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies
                .first()
                .cloned()
                .unwrap_or_else(|| UploadReply::Session("abc123".to_string()))
        }
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let notified = gate.notified();
            self.entered_count.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            notified.await;
        }
    }
}

pub struct FakeService {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeService {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState {
            hits: Hits::default(),
            upload_replies: Mutex::new(Vec::new()),
            convert_reply: Mutex::new(ConvertReply::Archive(EMPTY_ZIP.to_vec())),
            uploads: Mutex::new(Vec::new()),
            convert_bodies: Mutex::new(Vec::new()),
            session_queries: Mutex::new(Vec::new()),
            remote_files: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            entered: Notify::new(),
            entered_count: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/upload", post(upload))
            .route("/convert-and-zip", post(convert))
            .route("/list-files", get(list_files))
            .route("/delete-all", post(delete_all))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake service");
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn set_upload_replies(&self, replies: Vec<UploadReply>) {
        *self.state.upload_replies.lock().unwrap() = replies;
    }

    pub fn set_convert_reply(&self, reply: ConvertReply) {
        *self.state.convert_reply.lock().unwrap() = reply;
    }

    /// Holds gated handlers until the returned handle is notified.
    pub fn close_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.state.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Lets later requests through without waiting.
    pub fn open_gate(&self) {
        self.state.gate.lock().unwrap().take();
    }

    /// Waits until `count` gated requests in total are parked at the gate.
    pub async fn wait_entered(&self, count: usize) {
        loop {
            let notified = self.state.entered.notified();
            if self.state.entered_count.load(Ordering::SeqCst) >= count {
                return;
            }
            notified.await;
        }
    }

    pub fn upload_hits(&self) -> usize {
        self.state.hits.upload.load(Ordering::SeqCst)
    }

    pub fn convert_hits(&self) -> usize {
        self.state.hits.convert.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<Vec<ReceivedPart>> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn convert_bodies(&self) -> Vec<serde_json::Value> {
        self.state.convert_bodies.lock().unwrap().clone()
    }
}

async fn upload(State(state): State<Arc<FakeState>>, mut multipart: Multipart) -> Response {
    state.hits.upload.fetch_add(1, Ordering::SeqCst);

    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap_or_default();
        parts.push(ReceivedPart {
            field: name,
            file_name,
            content_type,
            data,
        });
    }
    {
        let mut remote = state.remote_files.lock().unwrap();
        remote.extend(parts.iter().map(|p| p.file_name.clone()));
    }
    state.uploads.lock().unwrap().push(parts);

    state.pass_gate().await;

    match state.next_upload_reply() {
        UploadReply::Session(id) => Json(serde_json::json!({
            "message": "Files uploaded successfully",
            "session_id": id,
        }))
        .into_response(),
        UploadReply::Status(status) => {
            (status, Json(serde_json::json!({"detail": "upload failed"}))).into_response()
        }
        UploadReply::Body(body) => {
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
    }
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn convert(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.hits.convert.fetch_add(1, Ordering::SeqCst);
    state.convert_bodies.lock().unwrap().push(body);

    state.pass_gate().await;

    let reply = state.convert_reply.lock().unwrap().clone();
    match reply {
        ConvertReply::Archive(bytes) => (
            [
                (header::CONTENT_TYPE, "application/zip"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=converted-images.zip",
                ),
            ],
            bytes,
        )
            .into_response(),
        ConvertReply::Json(body) => {
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        ConvertReply::Status(status) => {
            (status, Json(serde_json::json!({"detail": "conversion failed"}))).into_response()
        }
    }
}

async fn list_files(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<SessionQuery>,
) -> Response {
    state.hits.list.fetch_add(1, Ordering::SeqCst);
    state.session_queries.lock().unwrap().push(query.session_id);
    let files = state.remote_files.lock().unwrap().clone();
    Json(serde_json::json!({ "files": files })).into_response()
}

async fn delete_all(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<SessionQuery>,
) -> Response {
    state.hits.purge.fetch_add(1, Ordering::SeqCst);
    state.session_queries.lock().unwrap().push(query.session_id);
    state.remote_files.lock().unwrap().clear();
    Json(serde_json::json!({ "message": "All files deleted" })).into_response()
}

pub fn setup_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Writes `files` into `dir` and returns them as a selection batch.
pub fn write_files(dir: &Path, files: &[(&str, &[u8])]) -> Vec<SelectedFile> {
    files
        .iter()
        .map(|(name, data)| {
            let path: PathBuf = dir.join(name);
            std::fs::write(&path, data).expect("write test file");
            SelectedFile::from_path(&path).expect("stat test file")
        })
        .collect()
}

/// A client pointed at `service`, saving archives into `download_dir`.
pub fn client_for(service: &FakeService, download_dir: &Path) -> TransferClient {
    let config = ClientConfig::new()
        .with_base_url(service.base_url())
        .with_download_dir(download_dir);
    TransferClient::with_http(reqwest::Client::new(), config)
}
