//! Error types for pipeline runs
//!
//! Row-level defects never surface here; they are routed to quarantine. Everything in
//! [`PipelineError`] aborts the run.

use std::path::PathBuf;
use thiserror::Error;

use crate::dedup::CoercionError;
use crate::ingest::IngestError;
use crate::sinks::SinkError;
use crate::store::StoreError;

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A source file could not be read
    #[error("Ingest failed: {0}")]
    Ingest(#[from] IngestError),

    /// A validated row failed to coerce
    #[error("Internal error: {0}")]
    Coercion(#[from] CoercionError),

    /// The batch transaction failed and was rolled back
    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    /// Writing the quarantine file or the snapshot failed
    #[error("Output failed: {0}")]
    Sink(#[from] SinkError),

    /// Validation worker pool could not be built
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// IO error with path context
    #[error("IO error with {path}: {message}")]
    IoErrorWithPath {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create an IO error with path context
    pub fn io_with_path(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::IoErrorWithPath {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Name of the stage the error belongs to, if any
    pub fn stage_name(&self) -> Option<&'static str> {
        match self {
            PipelineError::Ingest(_) => Some("ingest"),
            PipelineError::Coercion(_) => Some("dedup"),
            PipelineError::Store(_) => Some("persist"),
            PipelineError::Sink(_) => Some("output"),
            PipelineError::WorkerPool(_) => Some("validate"),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!(
                    "Configuration error: {msg}\n\nHint: Check your pipeline configuration file."
                )
            }
            PipelineError::Ingest(err) => err.user_message(),
            PipelineError::Store(err) => {
                format!(
                    "{}\n\nNo rows from this batch were written.",
                    err.user_message()
                )
            }
            PipelineError::Sink(err) => err.user_message(),
            PipelineError::Coercion(err) => {
                format!("{err}\n\nThis is a bug: validated rows must always coerce.")
            }
            PipelineError::IoErrorWithPath { path, message, source } => {
                format!(
                    "IO error while {message} ({}): {source}\n\n\
                    Hint: Check that the file exists and is readable.",
                    path.display()
                )
            }
            _ => self.to_string(),
        }
    }
}
