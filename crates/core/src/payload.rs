//! Upstream payload construction.
//!
//! Precedence rule: caller-supplied options are copied first, then every
//! structural field is written over them. A caller can therefore add any
//! option upstream understands but can never replace `type` or the
//! resolved file references.

use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct PayloadBuilder {
    fields: Map<String, Value>,
}

impl PayloadBuilder {
    /// Start from the caller's free-form options.
    pub fn from_options(options: Map<String, Value>) -> Self {
        Self { fields: options }
    }

    /// Set a structural field, overwriting any option with the same key.
    pub fn structural(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Some(previous) = self.fields.insert(key.to_string(), value.into()) {
            tracing::debug!(key, overridden = %previous, "Caller option replaced by structural field");
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}
