//! Error types for output sinks

use std::path::PathBuf;
use thiserror::Error;

/// Errors writing or reading the quarantine file or the canonical snapshot
#[derive(Error, Debug)]
pub enum SinkError {
    /// IO error on a sink path
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Arrow array construction error
    #[error("Arrow error: {0}")]
    Arrow(String),

    /// Parquet encoding or decoding error
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// Snapshot file does not have the expected columns
    #[error("Invalid snapshot {path}: {reason}")]
    InvalidSnapshot { path: PathBuf, reason: String },
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SinkError::Io { path, source } => {
                format!(
                    "Cannot write {}: {source}\n\nHint: Check that the output directory is writable.",
                    path.display()
                )
            }
            SinkError::InvalidSnapshot { path, reason } => {
                format!(
                    "Invalid snapshot {}: {reason}\n\n\
                    Hint: Re-run the pipeline to regenerate the snapshot.",
                    path.display()
                )
            }
            _ => self.to_string(),
        }
    }
}

impl From<csv::Error> for SinkError {
    fn from(err: csv::Error) -> Self {
        SinkError::Csv(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for SinkError {
    fn from(err: arrow::error::ArrowError) -> Self {
        SinkError::Arrow(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for SinkError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        SinkError::Parquet(err.to_string())
    }
}
