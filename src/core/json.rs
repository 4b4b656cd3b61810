/*!
 * JSON Serialization
 * Layout configuration files and machine-readable reports
 */

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Result type for JSON operations
pub type JsonResult<T> = Result<T, JsonError>;

/// JSON operation errors
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

/// Serialize to pretty-printed JSON
#[inline]
pub fn to_string_pretty<T: Serialize>(value: &T) -> JsonResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| JsonError::Serialization(e.to_string()))
}

/// Deserialize from a JSON string
#[inline]
pub fn from_str<T: DeserializeOwned>(text: &str) -> JsonResult<T> {
    serde_json::from_str(text).map_err(|e| JsonError::Deserialization(e.to_string()))
}

/// Read and deserialize a JSON file
pub fn from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> JsonResult<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| JsonError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    from_str(&text)
}
