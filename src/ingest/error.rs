//! Error types for source ingestion

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a defective source file or source location.
///
/// Row-level defects never surface here; they are carried to validation as text.
#[derive(Error, Debug)]
pub enum IngestError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Source directory missing or unreadable
    #[error("Source not accessible: {path} - {reason}")]
    SourceNotAccessible { path: PathBuf, reason: String },

    /// Pattern matching error
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// No reader for this file extension
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(PathBuf),

    /// File cannot be read as the format its extension promises
    #[error("Invalid file format: {path} - {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// A JSONL line is not a JSON object
    #[error("JSON parsing error in {path} at line {line}: {error}")]
    JsonParse {
        path: PathBuf,
        line: usize,
        error: String,
    },

    /// CSV decoding error
    #[error("CSV error in {path}: {error}")]
    Csv { path: PathBuf, error: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            IngestError::FileNotFound(path) => {
                format!(
                    "File not found: {}\n\nHint: Check that the file exists and the path is correct.",
                    path.display()
                )
            }
            IngestError::SourceNotAccessible { path, reason } => {
                format!(
                    "Cannot access source: {}\nReason: {reason}\n\n\
                    Hint: Check the source directory and its permissions.",
                    path.display()
                )
            }
            IngestError::InvalidPattern(pattern) => {
                format!(
                    "Invalid glob pattern: {pattern}\n\n\
                    Hint: Use standard glob syntax like '*.csv' or '**/*.jsonl'."
                )
            }
            IngestError::UnsupportedExtension(path) => {
                format!(
                    "Unsupported file type: {}\n\n\
                    Hint: Source files must end in .csv, .ndjson or .jsonl.",
                    path.display()
                )
            }
            IngestError::InvalidFormat { path, reason } => {
                format!(
                    "Invalid file format: {}\nReason: {reason}\n\n\
                    Hint: CSV drops need a header row naming fecha, id_cliente, id_producto, \
                    unidades and precio_unitario.",
                    path.display()
                )
            }
            IngestError::JsonParse { path, line, error } => {
                format!(
                    "JSON parse error in {} at line {line}:\n{error}\n\n\
                    Hint: Each line must hold one JSON object.",
                    path.display()
                )
            }
            _ => self.to_string(),
        }
    }
}
