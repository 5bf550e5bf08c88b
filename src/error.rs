//! Error types for the search, fetch, extract and report stages.
//!
//! Library functions return [`Result`]; the binary reports any of them as a
//! single `Error:` line and writes no output.

use thiserror::Error;

/// Failure in any pipeline stage.
#[derive(Debug, Error)]
pub enum PubmedError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// E-utilities returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from API
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed XML document
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result of a pipeline stage
pub type Result<T> = std::result::Result<T, PubmedError>;

/// Turns a missing response field into [`PubmedError::Parse`]
pub trait OptionExt<T> {
    /// `None` becomes a parse error carrying `msg`, e.g. a missing `esearchresult`
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| PubmedError::Parse(msg.to_string()))
    }
}
