//! Normalized view of an upstream job-status object.
//!
//! Handlers return upstream bodies verbatim; [`JobStatus`] is recomputed
//! from each response for logging and never cached.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Unknown,
}

impl JobState {
    pub fn from_upstream(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "queued" | "pending" => Self::Queued,
            "running" | "in_progress" | "processing" => Self::Running,
            "success" | "succeeded" | "completed" => Self::Succeeded,
            "failed" | "banned" | "expired" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: Option<f64>,
    /// Reference to the primary result artifact, when the job produced one.
    pub result: Option<String>,
    pub error: Option<String>,
}

impl JobStatus {
    /// Extract a status from either a bare status object or a `{data: ...}` envelope.
    pub fn from_upstream(body: &Value) -> Self {
        let record = match body.get("data") {
            Some(data) if data.is_object() => data,
            _ => body,
        };

        let state = record
            .get("status")
            .and_then(Value::as_str)
            .map(JobState::from_upstream)
            .unwrap_or(JobState::Unknown);

        let progress = record.get("progress").and_then(Value::as_f64);

        let result = ["output", "result"]
            .iter()
            .filter_map(|key| record.get(*key))
            .find_map(artifact_reference);

        let error = record
            .get("task_error")
            .and_then(|e| e.get("message"))
            .or_else(|| record.get("error"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            state,
            progress,
            result,
            error,
        }
    }
}

/// Prefer a `model` entry, otherwise the first string value.
fn artifact_reference(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    obj.get("model")
        .and_then(Value::as_str)
        .or_else(|| obj.values().find_map(Value::as_str))
        .map(str::to_string)
}
