//! Upstream family configuration.
//!
//! Settings are built once at startup by the entry point and handed to
//! [`HttpJobApi::new`](crate::api::HttpJobApi::new); nothing in this crate
//! reads the environment.

/// Default base URL of the generation API.
pub const DEFAULT_GENERATION_BASE_URL: &str = "https://api.tripo3d.ai/v2/openapi";

/// Default base URL of the rigging API.
pub const DEFAULT_RIGGING_BASE_URL: &str = "https://api.meshy.ai/openapi/v1";

/// The upstream API families the gateway can delegate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamFamily {
    /// Text/image/multiview to model, texture generation, file uploads.
    Generation,
    /// Rigging jobs and their live event stream.
    Rigging,
}

impl UpstreamFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Rigging => "rigging",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Generation => DEFAULT_GENERATION_BASE_URL,
            Self::Rigging => DEFAULT_RIGGING_BASE_URL,
        }
    }
}

impl std::fmt::Display for UpstreamFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for one upstream family.
#[derive(Clone)]
pub struct UpstreamSettings {
    pub family: UpstreamFamily,
    pub base_url: String,
    /// Bearer credential. `None` makes every call fail with `Misconfigured`.
    pub api_key: Option<String>,
}

impl UpstreamSettings {
    /// Blank keys are treated as absent.
    pub fn new(family: UpstreamFamily, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            family,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("family", &self.family)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
