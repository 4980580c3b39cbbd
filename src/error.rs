//! Error types for the loader pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or malformed configuration (credentials, URLs)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required identifier column is absent from a source table
    #[error("Schema error in {source_name}: required column '{column}' not found")]
    Schema { source_name: String, column: String },

    /// No usable input files were found
    #[error("No input files: {0}")]
    NoInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote store rejected a request
    #[error("Store rejected request ({status}): {message}")]
    Store { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
