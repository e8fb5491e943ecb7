#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use futures::stream::{self, Stream};
use futures::StreamExt;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use modelgate_api::config::ServerConfig;
use modelgate_api::router::build_app_router;
use modelgate_api::state::AppState;
use modelgate_core::staging::{StagingArea, UploadLimits};
use modelgate_upstream::{
    ByteStream, FormPart, JobApi, UpstreamError, UpstreamFamily, UpstreamResponse,
    UpstreamSettings,
};

// ---------------------------------------------------------------------------
// Recording upstream double
// ---------------------------------------------------------------------------

/// One call received by a [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Json { path: String, payload: Value },
    Multipart { path: String, parts: Vec<RecordedPart> },
    Get { path: String, query: Vec<(String, String)> },
    Delete { path: String },
    Stream { path: String },
}

/// A multipart part as seen at submission time.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPart {
    pub name: String,
    pub text: Option<String>,
    /// File size on disk when the part was submitted; `None` for text parts.
    pub file_len: Option<u64>,
    pub media_type: Option<String>,
}

/// Scripted behaviour of `open_stream`.
pub enum ScriptedStream {
    /// Yield these chunks, then end.
    Chunks(Vec<Result<Bytes, UpstreamError>>),
    /// Yield these chunks, then stay open until dropped. Sets the flag on drop.
    ChunksThenPending(Vec<Bytes>, Arc<AtomicBool>),
    /// Fail to connect.
    ConnectError(UpstreamError),
}

/// In-memory [`JobApi`] that records every call and replays scripted answers.
///
/// Unscripted calls answer `200 {"code":0,"data":{"call":<n>}}`.
pub struct RecordingApi {
    family: UpstreamFamily,
    calls: Mutex<Vec<Call>>,
    responses: Mutex<VecDeque<Result<UpstreamResponse, UpstreamError>>>,
    stream: Mutex<Option<ScriptedStream>>,
}

impl RecordingApi {
    pub fn new(family: UpstreamFamily) -> Arc<Self> {
        Arc::new(Self {
            family,
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            stream: Mutex::new(None),
        })
    }

    pub fn respond(&self, response: Result<UpstreamResponse, UpstreamError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn respond_ok(&self, status: u16, body: Value) {
        self.respond(Ok(UpstreamResponse { status, body }));
    }

    pub fn script_stream(&self, stream: ScriptedStream) {
        *self.stream.lock().unwrap() = Some(stream);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: Call) -> Result<UpstreamResponse, UpstreamError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        let n = calls.len();
        drop(calls);

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(UpstreamResponse {
                    status: 200,
                    body: json!({ "code": 0, "data": { "call": n } }),
                })
            })
    }
}

#[async_trait]
impl JobApi for RecordingApi {
    fn family(&self) -> UpstreamFamily {
        self.family
    }

    async fn submit_json(
        &self,
        path: &str,
        payload: &Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.record(Call::Json {
            path: path.to_string(),
            payload: payload.clone(),
        })
    }

    async fn submit_multipart(
        &self,
        path: &str,
        parts: Vec<FormPart>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let parts = parts
            .into_iter()
            .map(|part| match part {
                FormPart::Text { name, value } => RecordedPart {
                    name,
                    text: Some(value),
                    file_len: None,
                    media_type: None,
                },
                FormPart::File {
                    name,
                    path,
                    media_type,
                    ..
                } => RecordedPart {
                    name,
                    text: None,
                    file_len: std::fs::metadata(&path).ok().map(|m| m.len()),
                    media_type: Some(media_type),
                },
            })
            .collect();
        self.record(Call::Multipart {
            path: path.to_string(),
            parts,
        })
    }

    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.record(Call::Get {
            path: path.to_string(),
            query: query.to_vec(),
        })
    }

    async fn delete(&self, path: &str) -> Result<UpstreamResponse, UpstreamError> {
        self.record(Call::Delete {
            path: path.to_string(),
        })
    }

    async fn open_stream(&self, path: &str) -> Result<ByteStream, UpstreamError> {
        self.calls.lock().unwrap().push(Call::Stream {
            path: path.to_string(),
        });

        let scripted = self.stream.lock().unwrap().take();
        match scripted {
            None => Ok(stream::empty().boxed()),
            Some(ScriptedStream::Chunks(chunks)) => Ok(stream::iter(chunks).boxed()),
            Some(ScriptedStream::ChunksThenPending(chunks, dropped)) => {
                let chunks = stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending());
                Ok(Guarded {
                    inner: chunks.boxed(),
                    _flag: DropFlag(dropped),
                }
                .boxed())
            }
            Some(ScriptedStream::ConnectError(err)) => Err(err),
        }
    }
}

/// A stream that sets a flag once it is dropped.
struct Guarded {
    inner: ByteStream,
    _flag: DropFlag,
}

impl Stream for Guarded {
    type Item = Result<Bytes, UpstreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Sets its flag when dropped, i.e. when the upstream stream is closed.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults and credentials present.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        upload_dir: upload_dir.to_path_buf(),
        upload_limits: UploadLimits::default(),
        generation: UpstreamSettings::new(
            UpstreamFamily::Generation,
            "http://generation.test",
            Some("sk-gen".into()),
        ),
        rigging: UpstreamSettings::new(
            UpstreamFamily::Rigging,
            "http://rigging.test",
            Some("sk-rig".into()),
        ),
    }
}

/// A router wired to recording doubles, plus handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub staging: StagingArea,
    pub generation: Arc<RecordingApi>,
    pub rigging: Arc<RecordingApi>,
    // Keeps the upload directory alive for the test's duration.
    pub upload_dir: tempfile::TempDir,
}

/// Build the full application router (same middleware stack as production)
/// over recording upstream doubles.
pub fn build_test_app() -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = test_config(upload_dir.path());
    let generation = RecordingApi::new(UpstreamFamily::Generation);
    let rigging = RecordingApi::new(UpstreamFamily::Rigging);

    let (router, staging) = build_with_apis(config, generation.clone(), rigging.clone());
    TestApp {
        router,
        staging,
        generation,
        rigging,
        upload_dir,
    }
}

/// Build the router over arbitrary [`JobApi`] implementations.
pub fn build_with_apis(
    config: ServerConfig,
    generation: Arc<dyn JobApi>,
    rigging: Arc<dyn JobApi>,
) -> (Router, StagingArea) {
    let staging = StagingArea::new(config.upload_dir.clone(), config.upload_limits.clone());
    let state = AppState {
        config: Arc::new(config.clone()),
        staging: staging.clone(),
        generation,
        rigging,
    };
    (build_app_router(state, &config), staging)
}

/// Files currently present in a directory.
pub fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_multipart(app: Router, uri: &str, form: MultipartBody) -> Response {
    let (content_type, body) = form.finish();
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Multipart body builder
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "modelgate-test-boundary";

/// Minimal `multipart/form-data` encoder for request bodies.
#[derive(Default)]
pub struct MultipartBody {
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, media_type: &str, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {media_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(bytes);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.buf)
    }
}
