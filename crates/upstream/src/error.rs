//! Normalized upstream failures.
//!
//! Every upstream family reports errors in its own vocabulary. They are
//! folded into [`UpstreamError`], which always yields a status code
//! (upstream's when it answered, 500 otherwise), a human-readable message,
//! and the raw body for debugging.

use serde_json::Value;

use crate::config::UpstreamFamily;

/// Status used when upstream never produced one.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// No credential is configured for the family. No network call was made.
    #[error("The {family} upstream is not configured: missing API key")]
    Misconfigured { family: UpstreamFamily },

    /// Upstream answered with a non-2xx status.
    #[error("{message}")]
    Response {
        status: u16,
        message: String,
        raw_body: Value,
    },

    /// Upstream could not be reached (connection refused, DNS, TLS, timeout).
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    /// An established stream failed while being read.
    #[error("Upstream stream failed: {0}")]
    Transport(String),

    /// A staged upload could not be read for forwarding.
    #[error("Failed to read staged upload: {0}")]
    LocalIo(#[from] std::io::Error),
}

impl UpstreamError {
    /// Build an error from a non-2xx response body.
    pub fn from_response(status: u16, raw_body: Value) -> Self {
        let message = extract_message(&raw_body)
            .unwrap_or_else(|| format!("Upstream returned HTTP {status}"));
        Self::Response {
            status,
            message,
            raw_body,
        }
    }

    /// Upstream's status code when it answered, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Response { status, .. } => *status,
            _ => DEFAULT_ERROR_STATUS,
        }
    }

    pub fn raw_body(&self) -> Option<&Value> {
        match self {
            Self::Response { raw_body, .. } if !raw_body.is_null() => Some(raw_body),
            _ => None,
        }
    }

    /// The message without the variant prefix, suitable for clients.
    pub fn message(&self) -> String {
        match self {
            Self::Response { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        // Body-read failures after headers arrived look the same to callers.
        Self::Unreachable(err.to_string())
    }
}

/// Pull a message out of a vendor error body.
///
/// Checks `error` (string, or an object carrying `message`), then
/// `message`, then a non-empty plain-text body.
fn extract_message(body: &Value) -> Option<String> {
    let from_error = match body.get("error") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("message").and_then(Value::as_str),
        _ => None,
    };

    from_error
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
