use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use modelgate_core::error::CoreError;
use modelgate_core::staging::StagingError;
use modelgate_upstream::UpstreamError;
use serde_json::{json, Value};

/// Application-level error type for HTTP handlers.
///
/// Wraps the local validation, staging, and upstream error types and
/// implements [`IntoResponse`] to produce `{error, code, details?}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Local validation failure from `modelgate_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Upload staging failure (media type, size, count, I/O).
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Upstream failure, misconfiguration, or unreachability.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route matched the request.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request could not be extracted (malformed JSON, wrong content
    /// type, bad multipart body or query string).
    #[error("Rejected request: {message}")]
    Rejected { status: StatusCode, message: String },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // --- Local validation ---
            AppError::Core(core) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                core.message().to_string(),
                None,
            ),

            // --- Staging ---
            AppError::Staging(staging) => classify_staging_error(staging),

            // --- Upstream ---
            AppError::Upstream(upstream) => classify_upstream_error(upstream),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Rejected { status, message } => classify_rejection(*status, message),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, axum::Json(body)).into_response()
    }
}

type Classified = (StatusCode, &'static str, String, Option<Value>);

/// Extractor rejections keep 413 and 415; every other one is a 400.
fn classify_rejection(status: StatusCode, message: &str) -> Classified {
    let (status, code) = match status {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => (status, "UNSUPPORTED_MEDIA_TYPE"),
        StatusCode::PAYLOAD_TOO_LARGE => (status, "PAYLOAD_TOO_LARGE"),
        _ => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
    };
    (status, code, message.to_string(), None)
}

/// - `TooLarge` maps to 413.
/// - I/O failures map to 500 with a sanitized message.
/// - Everything else is the caller's fault (400).
fn classify_staging_error(err: &StagingError) -> Classified {
    match err {
        StagingError::InvalidMediaType(_) => (
            StatusCode::BAD_REQUEST,
            "INVALID_MEDIA_TYPE",
            err.to_string(),
            None,
        ),
        StagingError::TooLarge { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            "FILE_TOO_LARGE",
            err.to_string(),
            None,
        ),
        StagingError::TooManyFiles { .. } => (
            StatusCode::BAD_REQUEST,
            "TOO_MANY_FILES",
            err.to_string(),
            None,
        ),
        StagingError::MissingFile => (
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            err.to_string(),
            None,
        ),
        StagingError::Io(io) => {
            tracing::error!(error = %io, "Staging I/O error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}

/// Upstream's own status passes through; anything it did not answer maps to 500.
fn classify_upstream_error(err: &UpstreamError) -> Classified {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match err {
        UpstreamError::Misconfigured { family } => {
            tracing::error!(family = %family, "Upstream credential missing");
            (status, "UPSTREAM_MISCONFIGURED", err.message(), None)
        }
        UpstreamError::Response { .. } => (
            status,
            "UPSTREAM_ERROR",
            err.message(),
            err.raw_body().cloned(),
        ),
        UpstreamError::Unreachable(_) | UpstreamError::Transport(_) => {
            (status, "UPSTREAM_UNREACHABLE", err.message(), None)
        }
        UpstreamError::LocalIo(io) => {
            tracing::error!(error = %io, "Failed to read staged upload for forwarding");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}
