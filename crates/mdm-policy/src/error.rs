//! Error types for policy documents

/// Policy document errors
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Malformed JSON text
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Output encoding failed
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Document root is not a JSON object
    #[error("policy document must be a JSON object, got {0}")]
    NotAMapping(&'static str),

    /// Operation needs at least one path segment
    #[error("path must not be empty")]
    EmptyPath,

    /// List operation on a non-list value
    #[error("value at '{0}' is not a list")]
    NotAList(String),

    /// Segment does not address an element of the list at that level
    #[error("invalid list index '{segment}' in '{path}'")]
    BadListIndex {
        /// Full path being written
        path: String,
        /// Offending segment
        segment: String,
    },
}

/// Name of a JSON value's type, for error messages
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
