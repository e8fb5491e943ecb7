//! Multipart ingestion into the temporary asset store.
//!
//! File fields are validated (count, media type) before their bytes are
//! read and their size is checked chunk by chunk, so an oversized upload
//! is rejected without buffering the whole payload. Everything staged
//! lives in the returned [`StagingBatch`]; if ingestion fails part-way the
//! batch is dropped and its files are deleted.

use std::collections::HashMap;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::BytesMut;
use modelgate_core::staging::{StagingArea, StagingBatch, StagingError};

use crate::error::{AppError, AppResult};

/// Files staged from one request plus its plain-text fields.
#[derive(Debug)]
pub struct StagedForm {
    pub batch: StagingBatch,
    pub fields: HashMap<String, String>,
}

/// Stage every `file_field` part (at most `max_files`) and collect text fields.
///
/// Fails with `MissingFile` when no file part was sent.
pub async fn stage_form(
    staging: &StagingArea,
    mut multipart: Multipart,
    file_field: &str,
    max_files: usize,
) -> AppResult<StagedForm> {
    let mut batch = staging.batch(max_files);
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(staging, e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            batch.ensure_capacity()?;
            let media_type = staging.check_media_type(field.content_type())?;
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = read_limited(staging, field).await?;
            batch.stage(bytes.freeze(), &media_type, &original_name).await?;
        } else if field.file_name().is_some() {
            return Err(AppError::BadRequest(format!(
                "Unexpected file field '{name}'; expected '{file_field}'"
            )));
        } else {
            let text = field.text().await.map_err(|e| multipart_error(staging, e))?;
            fields.insert(name, text);
        }
    }

    if batch.is_empty() {
        return Err(StagingError::MissingFile.into());
    }

    Ok(StagedForm { batch, fields })
}

/// Read a field, failing as soon as it exceeds the per-file ceiling.
async fn read_limited(staging: &StagingArea, mut field: Field<'_>) -> AppResult<BytesMut> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(staging, e))?
    {
        staging.check_size((buf.len() + chunk.len()) as u64)?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn multipart_error(staging: &StagingArea, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StagingError::TooLarge {
            limit: staging.limits().max_file_bytes,
        }
        .into()
    } else {
        AppError::BadRequest(err.body_text())
    }
}
