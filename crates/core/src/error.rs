#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The caller's payload failed local validation. Never forwarded upstream.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// The human-readable message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(msg) => msg,
        }
    }
}
