//! Error types for json-diagram

use crate::diagram::document::DocumentFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("Invalid {format} content: {message}")]
    Parse {
        format: DocumentFormat,
        message: String,
    },

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Graph invariant violated: {0}")]
    Invariant(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config decode error: {0}")]
    ConfigDecode(#[from] toml::de::Error),

    #[error("Config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),
}

impl DiagramError {
    /// Whether this error means the input text was rejected (the "invalid content" state)
    pub fn is_invalid_content(&self) -> bool {
        matches!(self, DiagramError::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, DiagramError>;
