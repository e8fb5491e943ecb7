//! Server-sent event framing used by the relay.

use axum::http::header::{HeaderName, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use bytes::Bytes;
use serde_json::json;

/// Headers committed when the relay connection opens.
pub const STREAM_HEADERS: [(HeaderName, &str); 4] = [
    (CONTENT_TYPE, "text/event-stream"),
    (CACHE_CONTROL, "no-cache"),
    (CONNECTION, "keep-alive"),
    (HeaderName::from_static("x-accel-buffering"), "no"),
];

/// An in-band error event: `event: error\ndata: {"error":"..."}\n\n`.
pub fn error_frame(message: &str) -> Bytes {
    let data = json!({ "error": message });
    Bytes::from(format!("event: error\ndata: {data}\n\n"))
}
