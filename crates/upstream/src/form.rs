//! Multipart form parts for upstream submission.
//!
//! File parts reference a staged upload by path; the bytes are streamed
//! from disk when the request is sent, so the gateway never holds a whole
//! multiview batch in memory. The caller keeps the [`StagedUpload`] guard
//! alive until the submission returns.

use std::path::PathBuf;

use modelgate_core::staging::StagedUpload;
use tokio_util::io::ReaderStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        path: PathBuf,
        file_name: String,
        media_type: String,
        size: u64,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A file part backed by a staged upload.
    pub fn staged(name: impl Into<String>, upload: &StagedUpload) -> Self {
        Self::File {
            name: name.into(),
            path: upload.path().to_path_buf(),
            file_name: upload.original_name().to_string(),
            media_type: upload.media_type().to_string(),
            size: upload.size(),
        }
    }
}

/// Assemble a reqwest form, opening file parts as streams.
pub(crate) async fn into_reqwest_form(
    parts: Vec<FormPart>,
) -> Result<reqwest::multipart::Form, crate::error::UpstreamError> {
    let mut form = reqwest::multipart::Form::new();

    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                path,
                file_name,
                media_type,
                size,
            } => {
                let file = tokio::fs::File::open(&path).await?;
                let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
                let part = reqwest::multipart::Part::stream_with_length(body, size)
                    .file_name(file_name)
                    .mime_str(&media_type)
                    .map_err(|e| {
                        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
                    })?;
                form.part(name, part)
            }
        };
    }

    Ok(form)
}
