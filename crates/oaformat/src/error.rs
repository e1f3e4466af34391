use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Document root must be an object, found {0}")]
    InvalidDocument(&'static str),

    #[error("Invalid path expression {expression:?} at offset {offset}: {reason}")]
    InvalidPath {
        expression: String,
        offset: usize,
        reason: String,
    },
}

/// Name of a JSON value's type, used in error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Every stage takes a private copy of an object-rooted document.
pub(crate) fn ensure_object(document: &serde_json::Value) -> Result<()> {
    if document.is_object() {
        Ok(())
    } else {
        Err(Error::InvalidDocument(kind_of(document)))
    }
}
