//! HTTP client for the upstream job APIs.
//!
//! [`JobApi`] is the seam the gateway handlers program against; it is
//! implemented by [`HttpJobApi`] for real upstreams and by recording
//! doubles in tests. Every call injects the family's bearer credential and
//! normalizes failures into [`UpstreamError`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

use crate::config::{UpstreamFamily, UpstreamSettings};
use crate::error::UpstreamError;
use crate::form::{into_reqwest_form, FormPart};

/// Chunks of a live upstream event stream, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// A successful (2xx) upstream answer.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Parsed JSON body; a non-JSON body is carried as a string, an empty one as null.
    pub body: Value,
}

/// Outbound operations against one upstream family.
#[async_trait]
pub trait JobApi: Send + Sync {
    fn family(&self) -> UpstreamFamily;

    async fn submit_json(&self, path: &str, payload: &Value)
        -> Result<UpstreamResponse, UpstreamError>;

    async fn submit_multipart(
        &self,
        path: &str,
        parts: Vec<FormPart>,
    ) -> Result<UpstreamResponse, UpstreamError>;

    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<UpstreamResponse, UpstreamError>;

    async fn delete(&self, path: &str) -> Result<UpstreamResponse, UpstreamError>;

    /// Open a server-push stream. Dropping the returned stream closes the connection.
    async fn open_stream(&self, path: &str) -> Result<ByteStream, UpstreamError>;
}

// ---------------------------------------------------------------------------
// HttpJobApi
// ---------------------------------------------------------------------------

/// reqwest-backed [`JobApi`] for a single upstream family.
pub struct HttpJobApi {
    client: reqwest::Client,
    settings: UpstreamSettings,
}

impl HttpJobApi {
    /// Create a client with its own connection pool.
    pub fn new(settings: UpstreamSettings) -> Self {
        Self::with_client(reqwest::Client::new(), settings)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, settings: UpstreamSettings) -> Self {
        if !settings.is_configured() {
            tracing::warn!(
                family = %settings.family,
                "No API key configured; every request to this upstream will fail",
            );
        }
        Self { client, settings }
    }

    // ---- private helpers ----

    /// The bearer credential, or `Misconfigured` before any network I/O.
    fn credential(&self) -> Result<&str, UpstreamError> {
        self.settings
            .api_key
            .as_deref()
            .ok_or(UpstreamError::Misconfigured {
                family: self.settings.family,
            })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(family = %self.settings.family, path, error = %e, "Upstream unreachable");
            UpstreamError::from(e)
        })?;
        let status = response.status();
        let body = read_body(response).await?;

        if !status.is_success() {
            tracing::warn!(
                family = %self.settings.family,
                path,
                status = status.as_u16(),
                body = %body,
                "Upstream returned an error",
            );
            return Err(UpstreamError::from_response(status.as_u16(), body));
        }

        tracing::debug!(family = %self.settings.family, path, status = status.as_u16(), "Upstream call succeeded");
        Ok(UpstreamResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    fn family(&self) -> UpstreamFamily {
        self.settings.family
    }

    async fn submit_json(
        &self,
        path: &str,
        payload: &Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let key = self.credential()?;
        let request = self.client.post(self.url(path)).bearer_auth(key).json(payload);
        self.send(request, path).await
    }

    async fn submit_multipart(
        &self,
        path: &str,
        parts: Vec<FormPart>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let key = self.credential()?;
        let form = into_reqwest_form(parts).await?;
        let request = self
            .client
            .post(self.url(path))
            .bearer_auth(key)
            .multipart(form);
        self.send(request, path).await
    }

    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<UpstreamResponse, UpstreamError> {
        let key = self.credential()?;
        let request = self.client.get(self.url(path)).bearer_auth(key).query(query);
        self.send(request, path).await
    }

    async fn delete(&self, path: &str) -> Result<UpstreamResponse, UpstreamError> {
        let key = self.credential()?;
        let request = self.client.delete(self.url(path)).bearer_auth(key);
        self.send(request, path).await
    }

    async fn open_stream(&self, path: &str) -> Result<ByteStream, UpstreamError> {
        let key = self.credential()?;
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body(response).await?;
            return Err(UpstreamError::from_response(status.as_u16(), body));
        }

        tracing::info!(family = %self.settings.family, path, "Upstream stream opened");

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UpstreamError::Transport(e.to_string())))
            .boxed())
    }
}

/// Read a body as JSON, falling back to a string for non-JSON payloads.
async fn read_body(response: reqwest::Response) -> Result<Value, UpstreamError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}
