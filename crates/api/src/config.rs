use std::path::PathBuf;

use modelgate_core::staging::{
    UploadLimits, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_MULTIVIEW_FILES,
};
use modelgate_upstream::{UpstreamFamily, UpstreamSettings};

/// Slack on top of the largest multipart upload for boundaries and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// Built once in `main` and passed into the upstream clients and the
/// shared state. Nothing else in the gateway reads the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Time allowed until response headers are produced (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory where uploads are staged (default: `uploads`).
    pub upload_dir: PathBuf,
    /// Per-request upload limits.
    pub upload_limits: UploadLimits,
    /// Generation API settings.
    pub generation: UpstreamSettings,
    /// Rigging API settings.
    pub rigging: UpstreamSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                              |
    /// |------------------------|--------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                            |
    /// | `PORT`                 | `3000`                               |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`              |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                 |
    /// | `UPLOAD_DIR`           | `uploads`                            |
    /// | `MAX_UPLOAD_BYTES`     | `5242880`                            |
    /// | `MAX_MULTIVIEW_FILES`  | `6`                                  |
    /// | `GENERATION_API_URL`   | `https://api.tripo3d.ai/v2/openapi`  |
    /// | `GENERATION_API_KEY`   | unset                                |
    /// | `RIGGING_API_URL`      | `https://api.meshy.ai/openapi/v1`    |
    /// | `RIGGING_API_KEY`      | unset                                |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let upload_dir = PathBuf::from(
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
        );

        let max_file_bytes: u64 = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid u64");

        let max_multiview_files: usize = std::env::var("MAX_MULTIVIEW_FILES")
            .unwrap_or_else(|_| DEFAULT_MAX_MULTIVIEW_FILES.to_string())
            .parse()
            .expect("MAX_MULTIVIEW_FILES must be a valid usize");

        let upload_limits = UploadLimits {
            max_file_bytes,
            max_multiview_files,
            ..UploadLimits::default()
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            upload_dir,
            upload_limits,
            generation: upstream_from_env(UpstreamFamily::Generation, "GENERATION"),
            rigging: upstream_from_env(UpstreamFamily::Rigging, "RIGGING"),
        }
    }

    /// Request body ceiling: a full multiview batch plus multipart overhead.
    pub fn body_limit_bytes(&self) -> usize {
        let files = self.upload_limits.max_multiview_files.max(self.upload_limits.max_files);
        (self.upload_limits.max_file_bytes as usize).saturating_mul(files)
            + MULTIPART_OVERHEAD_BYTES
    }
}

fn upstream_from_env(family: UpstreamFamily, prefix: &str) -> UpstreamSettings {
    let base_url = std::env::var(format!("{prefix}_API_URL"))
        .unwrap_or_else(|_| family.default_base_url().to_string());
    let api_key = std::env::var(format!("{prefix}_API_KEY")).ok();
    UpstreamSettings::new(family, base_url, api_key)
}
