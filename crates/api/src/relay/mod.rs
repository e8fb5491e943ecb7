//! Live rigging progress relay.
//!
//! A [`StreamRelay`] connects one downstream client to one upstream event
//! stream. A spawned reader task owns the upstream connection and forwards
//! each chunk, unmodified and in order, through a small channel into the
//! downstream response body. The body holds the drop guard of the relay's
//! [`CancellationToken`], so when the client disconnects and the body is
//! dropped the reader is cancelled and the upstream connection closes.
//!
//! Lifecycle:
//!
//! ```text
//! Connecting --ok--> Streaming --end--> Completed
//!     |                  |
//!     +--error-----------+--error--> UpstreamFailed   (one error event sent)
//!     +--client gone-----+---------> ClientDisconnected
//! ```
//!
//! Headers are committed before the upstream connection is attempted, so
//! every failure is reported in-band.

pub mod sse;

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use modelgate_upstream::JobApi;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Chunks buffered between the reader and the response body.
const RELAY_CHANNEL_CAPACITY: usize = 16;

/// Relay lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Connecting,
    Streaming,
    Completed,
    UpstreamFailed,
    ClientDisconnected,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::UpstreamFailed | Self::ClientDisconnected
        )
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// A started relay: its downstream body and the reader task.
pub struct StreamRelay {
    body: RelayBody,
    reader: JoinHandle<RelayState>,
}

impl StreamRelay {
    /// Spawn the upstream reader for `path` and return the relay.
    pub fn start(api: Arc<dyn JobApi>, path: String) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);

        let reader = tokio::spawn(run_reader(api, path, tx, cancel.clone()));

        Self {
            body: RelayBody {
                chunks: ReceiverStream::new(rx),
                _cancel_on_drop: cancel.drop_guard(),
            },
            reader,
        }
    }

    /// Split into the downstream body and a handle resolving to the final state.
    pub fn into_parts(self) -> (RelayBody, JoinHandle<RelayState>) {
        (self.body, self.reader)
    }
}

impl IntoResponse for StreamRelay {
    fn into_response(self) -> Response {
        // The reader task logs its own outcome; the handle is not awaited.
        let (body, _reader) = self.into_parts();
        (sse::STREAM_HEADERS, Body::from_stream(body)).into_response()
    }
}

/// Downstream side of a relay. Dropping it cancels the upstream reader.
pub struct RelayBody {
    chunks: ReceiverStream<Bytes>,
    _cancel_on_drop: DropGuard,
}

impl Stream for RelayBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.chunks).poll_next(cx).map(|chunk| chunk.map(Ok))
    }
}

// ---------------------------------------------------------------------------
// Reader task
// ---------------------------------------------------------------------------

async fn run_reader(
    api: Arc<dyn JobApi>,
    path: String,
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
) -> RelayState {
    let family = api.family();
    tracing::info!(%family, path = %path, state = ?RelayState::Connecting, "Relay opening upstream stream");

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return finish(&path, RelayState::ClientDisconnected),
        opened = api.open_stream(&path) => opened,
    };

    let mut upstream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(%family, path = %path, error = %e, "Relay failed to connect upstream");
            forward(&tx, &cancel, sse::error_frame(&e.message())).await;
            return finish(&path, RelayState::UpstreamFailed);
        }
    };

    tracing::debug!(%family, path = %path, state = ?RelayState::Streaming, "Relay streaming");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return finish(&path, RelayState::ClientDisconnected),
            next = upstream.next() => next,
        };

        match next {
            Some(Ok(chunk)) if chunk.is_empty() => {}
            Some(Ok(chunk)) => {
                if !forward(&tx, &cancel, chunk).await {
                    return finish(&path, RelayState::ClientDisconnected);
                }
            }
            Some(Err(e)) => {
                tracing::warn!(%family, path = %path, error = %e, "Upstream stream failed");
                forward(&tx, &cancel, sse::error_frame(&e.message())).await;
                return finish(&path, RelayState::UpstreamFailed);
            }
            None => return finish(&path, RelayState::Completed),
        }
    }
}

/// Send one chunk downstream. Returns `false` once the client is gone.
async fn forward(tx: &mpsc::Sender<Bytes>, cancel: &CancellationToken, chunk: Bytes) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(chunk) => sent.is_ok(),
    }
}

fn finish(path: &str, state: RelayState) -> RelayState {
    tracing::info!(path, state = ?state, "Relay finished");
    state
}
