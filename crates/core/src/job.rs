//! Job kinds and inbound job-creation requests.
//!
//! A [`JobRequest`] is parsed from the caller's JSON body, validated per
//! kind (every kind needs at least one resolved input reference), and
//! turned into the upstream payload through [`PayloadBuilder`], which
//! enforces the structural-fields-win precedence rule.

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::payload::PayloadBuilder;

/// Default rig height when the caller does not supply one.
pub const DEFAULT_HEIGHT_METERS: f64 = 1.8;

// ---------------------------------------------------------------------------
// Job kinds
// ---------------------------------------------------------------------------

/// The recognized job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    TextToModel,
    ImageToModel,
    MultiviewToModel,
    TextureModel,
    Rigging,
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::TextToModel,
        JobKind::ImageToModel,
        JobKind::MultiviewToModel,
        JobKind::TextureModel,
        JobKind::Rigging,
    ];

    /// Wire name used in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextToModel => "text_to_model",
            Self::ImageToModel => "image_to_model",
            Self::MultiviewToModel => "multiview_to_model",
            Self::TextureModel => "texture_model",
            Self::Rigging => "rigging",
        }
    }

    pub fn parse(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                CoreError::invalid(format!(
                    "Unrecognized job type '{name}'. Must be one of: {}",
                    known.join(", ")
                ))
            })
    }

    /// Whether the upstream payload carries the kind as a `type` field.
    ///
    /// The rigging API is addressed by path and takes no `type`.
    fn sends_type(self) -> bool {
        !matches!(self, Self::Rigging)
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input references
// ---------------------------------------------------------------------------

/// An upstream-issued reference to a previously uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToken {
    pub token: String,
    /// Declared file type (e.g. `png`, `jpg`).
    pub media_type: String,
}

impl FileToken {
    /// Validate a caller-supplied `{type, file_token}` object.
    ///
    /// `index` is reported in the error when the object sits in a list.
    pub fn from_value(value: &Value, index: Option<usize>) -> Result<Self, CoreError> {
        let token = non_empty_str(value.get("file_token"));
        let media_type = non_empty_str(value.get("type"));

        match (token, media_type) {
            (Some(token), Some(media_type)) => Ok(Self {
                token: token.to_string(),
                media_type: media_type.to_string(),
            }),
            _ => Err(match index {
                Some(i) => CoreError::invalid(format!("File {i} is missing file_token or type")),
                None => CoreError::invalid("Missing 'file' object or file.file_token/file.type"),
            }),
        }
    }

    /// The structural file object sent upstream (only `type` and `file_token`).
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.media_type,
            "file_token": self.token,
        })
    }
}

/// The resolved input reference of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobInput {
    Prompt(String),
    File(FileToken),
    Files(Vec<FileToken>),
    OriginalTask(String),
    ModelUrl { url: String, height_meters: f64 },
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Upstream-issued job identifier, opaque to the gateway.
///
/// It is only checked to be a single non-empty path segment before being
/// spliced into an upstream URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::invalid("Missing task id"));
        }
        if raw
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
        {
            return Err(CoreError::invalid(format!("Invalid task id '{raw}'")));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A validated job-creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub kind: JobKind,
    pub input: JobInput,
    /// Free-form options forwarded verbatim (structural fields win on collision).
    pub options: Map<String, Value>,
}

impl JobRequest {
    /// Parse a `{type, <input>, ...options}` body.
    ///
    /// The kind is read from `type`, with `kind` accepted as an alias.
    pub fn from_body(body: Value) -> Result<Self, CoreError> {
        let mut fields = into_object(body)?;

        // Both keys are consumed so the alias never reaches the upstream payload.
        let declared = fields.remove("type");
        let alias = fields.remove("kind");
        let kind_value = declared.or(alias);
        let kind_name = non_empty_str(kind_value.as_ref())
            .ok_or_else(|| CoreError::invalid("Missing 'type' parameter"))?;
        let kind = JobKind::parse(kind_name)?;

        let input = take_input(kind, &mut fields)?;

        Ok(Self {
            kind,
            input,
            options: fields,
        })
    }

    /// Parse a body that must be of one particular kind.
    pub fn from_body_of_kind(body: Value, expected: JobKind) -> Result<Self, CoreError> {
        let declared = body
            .get("type")
            .or_else(|| body.get("kind"))
            .and_then(Value::as_str);
        if declared != Some(expected.as_str()) {
            return Err(CoreError::invalid(format!(
                "Type must be {}",
                expected.as_str()
            )));
        }
        Self::from_body(body)
    }

    /// Parse a `{prompt, options?}` text-to-model body.
    pub fn text_to_model(body: Value) -> Result<Self, CoreError> {
        let mut fields = into_object(body)?;

        let options = match fields.remove("options") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(options)) => options,
            Some(_) => return Err(CoreError::invalid("'options' must be an object")),
        };
        let input = take_input(JobKind::TextToModel, &mut fields)?;

        Ok(Self {
            kind: JobKind::TextToModel,
            input,
            options,
        })
    }

    /// Parse a `{model_url, height_meters?, ...options}` rigging body.
    pub fn rigging(body: Value) -> Result<Self, CoreError> {
        let mut fields = into_object(body)?;
        let input = take_input(JobKind::Rigging, &mut fields)?;

        Ok(Self {
            kind: JobKind::Rigging,
            input,
            options: fields,
        })
    }

    /// Build the upstream payload: caller options first, structural fields last.
    pub fn into_payload(self) -> Value {
        let mut builder = PayloadBuilder::from_options(self.options);

        if self.kind.sends_type() {
            builder = builder.structural("type", self.kind.as_str());
        }

        builder = match self.input {
            JobInput::Prompt(prompt) => builder.structural("prompt", prompt),
            JobInput::File(file) => builder.structural("file", file.to_value()),
            JobInput::Files(files) => builder.structural(
                "files",
                Value::Array(files.iter().map(FileToken::to_value).collect()),
            ),
            JobInput::OriginalTask(task_id) => {
                builder.structural("original_model_task_id", task_id)
            }
            JobInput::ModelUrl { url, height_meters } => builder
                .structural("model_url", url)
                .structural("height_meters", height_meters),
        };

        builder.build()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn into_object(body: Value) -> Result<Map<String, Value>, CoreError> {
    match body {
        Value::Object(fields) => Ok(fields),
        _ => Err(CoreError::invalid("Request body must be a JSON object")),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Remove and validate the kind's input field(s) from the caller's fields.
fn take_input(kind: JobKind, fields: &mut Map<String, Value>) -> Result<JobInput, CoreError> {
    match kind {
        JobKind::TextToModel => {
            let prompt = fields.remove("prompt");
            non_empty_str(prompt.as_ref())
                .map(|p| JobInput::Prompt(p.to_string()))
                .ok_or_else(|| CoreError::invalid("Missing 'prompt' parameter"))
        }
        JobKind::ImageToModel => {
            let file = fields
                .remove("file")
                .filter(Value::is_object)
                .ok_or_else(|| {
                    CoreError::invalid("Missing 'file' object or file.file_token/file.type")
                })?;
            Ok(JobInput::File(FileToken::from_value(&file, None)?))
        }
        JobKind::MultiviewToModel => {
            let files = match fields.remove("files") {
                Some(Value::Array(files)) if !files.is_empty() => files,
                _ => {
                    return Err(CoreError::invalid(
                        "Missing 'files' parameter or 'files' is not a non-empty array",
                    ))
                }
            };
            let tokens = files
                .iter()
                .enumerate()
                .map(|(i, file)| FileToken::from_value(file, Some(i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(JobInput::Files(tokens))
        }
        JobKind::TextureModel => {
            let task_id = fields.remove("original_model_task_id");
            non_empty_str(task_id.as_ref())
                .map(|id| JobInput::OriginalTask(id.to_string()))
                .ok_or_else(|| CoreError::invalid("Missing 'original_model_task_id' parameter"))
        }
        JobKind::Rigging => {
            let url = fields.remove("model_url");
            let url = non_empty_str(url.as_ref())
                .ok_or_else(|| CoreError::invalid("Missing 'model_url' parameter"))?
                .to_string();
            let height_meters = match fields.remove("height_meters") {
                None | Some(Value::Null) => DEFAULT_HEIGHT_METERS,
                Some(value) => value
                    .as_f64()
                    .filter(|h| *h > 0.0)
                    .ok_or_else(|| CoreError::invalid("'height_meters' must be a positive number"))?,
            };
            Ok(JobInput::ModelUrl { url, height_meters })
        }
    }
}
