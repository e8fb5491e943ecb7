//! Temporary asset store for uploaded images.
//!
//! Uploaded payloads are written under a staging directory and handed out
//! as [`StagedUpload`] guards. A guard owns its file: [`StagedUpload::release`]
//! deletes it explicitly, and dropping an unreleased guard deletes it too,
//! so every exit path of the owning request (success, upstream failure,
//! validation failure, panic unwinding) leaves nothing behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default per-file ceiling (5 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of files accepted by single-file endpoints.
pub const DEFAULT_MAX_FILES: usize = 1;

/// Default number of files accepted by the multiview endpoint.
pub const DEFAULT_MAX_MULTIVIEW_FILES: usize = 6;

/// Media types accepted by default.
pub const DEFAULT_ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/gif",
    "image/bmp",
];

/// Longest sanitized original name kept in a staged file name.
const MAX_NAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub max_multiview_files: usize,
    pub allowed_media_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            max_multiview_files: DEFAULT_MAX_MULTIVIEW_FILES,
            allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Unsupported media type '{0}': only image uploads are accepted")]
    InvalidMediaType(String),

    #[error("File exceeds the upload size limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Too many files: at most {limit} allowed per request")]
    TooManyFiles { limit: usize },

    #[error("No file was uploaded")]
    MissingFile,

    #[error("Staging I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// StagingArea
// ---------------------------------------------------------------------------

/// Shared handle to the staging directory; cheap to clone.
#[derive(Debug, Clone)]
pub struct StagingArea {
    inner: Arc<StagingInner>,
}

#[derive(Debug)]
struct StagingInner {
    dir: PathBuf,
    limits: UploadLimits,
    /// Number of staged uploads not yet released.
    outstanding: AtomicUsize,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>, limits: UploadLimits) -> Self {
        Self {
            inner: Arc::new(StagingInner {
                dir: dir.into(),
                limits,
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.inner.limits
    }

    /// Staged uploads currently alive.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Validate a declared media type against the allow-list.
    ///
    /// Returns the normalized type (lower-case, parameters stripped).
    pub fn check_media_type(&self, declared: Option<&str>) -> Result<String, StagingError> {
        let declared = declared.unwrap_or_default();
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if self
            .inner
            .limits
            .allowed_media_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
        {
            Ok(essence)
        } else {
            Err(StagingError::InvalidMediaType(declared.to_string()))
        }
    }

    /// Reject sizes above the per-file ceiling. Exactly the ceiling is accepted.
    pub fn check_size(&self, size: u64) -> Result<(), StagingError> {
        let limit = self.inner.limits.max_file_bytes;
        if size > limit {
            Err(StagingError::TooLarge { limit })
        } else {
            Ok(())
        }
    }

    /// Stage a payload on disk.
    pub async fn stage(
        &self,
        bytes: Bytes,
        declared_media_type: &str,
        original_name: &str,
    ) -> Result<StagedUpload, StagingError> {
        let media_type = self.check_media_type(Some(declared_media_type))?;
        self.check_size(bytes.len() as u64)?;

        tokio::fs::create_dir_all(&self.inner.dir).await?;

        let staged_name = format!("{}-{}", uuid::Uuid::new_v4(), sanitize_name(original_name));
        let path = self.inner.dir.join(&staged_name);

        // The guard exists before the write so a failed write is cleaned up too.
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        let upload = StagedUpload {
            path,
            staged_name,
            original_name: original_name.to_string(),
            media_type,
            size: bytes.len() as u64,
            released: false,
            area: Arc::clone(&self.inner),
        };

        tokio::fs::write(&upload.path, &bytes).await?;

        tracing::debug!(
            staged_name = %upload.staged_name,
            media_type = %upload.media_type,
            size = upload.size,
            "Upload staged",
        );

        Ok(upload)
    }

    /// Open a batch that accepts at most `max_files` uploads.
    pub fn batch(&self, max_files: usize) -> StagingBatch {
        StagingBatch {
            area: self.clone(),
            max_files,
            uploads: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// StagingBatch
// ---------------------------------------------------------------------------

/// The uploads staged for a single request.
#[derive(Debug)]
pub struct StagingBatch {
    area: StagingArea,
    max_files: usize,
    uploads: Vec<StagedUpload>,
}

impl StagingBatch {
    /// Fail with `TooManyFiles` once the batch is full.
    pub fn ensure_capacity(&self) -> Result<(), StagingError> {
        if self.uploads.len() >= self.max_files {
            Err(StagingError::TooManyFiles {
                limit: self.max_files,
            })
        } else {
            Ok(())
        }
    }

    pub async fn stage(
        &mut self,
        bytes: Bytes,
        declared_media_type: &str,
        original_name: &str,
    ) -> Result<&StagedUpload, StagingError> {
        self.ensure_capacity()?;
        let upload = self
            .area
            .stage(bytes, declared_media_type, original_name)
            .await?;
        self.uploads.push(upload);
        Ok(&self.uploads[self.uploads.len() - 1])
    }

    pub fn uploads(&self) -> &[StagedUpload] {
        &self.uploads
    }

    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }

    /// Release every upload in the batch.
    pub async fn release(mut self) {
        for upload in &mut self.uploads {
            upload.release().await;
        }
    }
}

// ---------------------------------------------------------------------------
// StagedUpload
// ---------------------------------------------------------------------------

/// A payload resident in the staging directory, deleted on release or drop.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    staged_name: String,
    original_name: String,
    media_type: String,
    size: u64,
    released: bool,
    area: Arc<StagingInner>,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn staged_name(&self) -> &str {
        &self.staged_name
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Delete the staged file. Idempotent; a missing file is not an error.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.area.outstanding.fetch_sub(1, Ordering::SeqCst);

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(staged_name = %self.staged_name, "Staged upload released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                staged_name = %self.staged_name,
                error = %e,
                "Failed to delete staged upload",
            ),
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.area.outstanding.fetch_sub(1, Ordering::SeqCst);

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(
                staged_name = %self.staged_name,
                "Staged upload released on drop",
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                staged_name = %self.staged_name,
                error = %e,
                "Failed to delete staged upload on drop",
            ),
        }
    }
}

/// Keep `[A-Za-z0-9._-]`, replace the rest, cap the length.
fn sanitize_name(original: &str) -> String {
    let base = original.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
