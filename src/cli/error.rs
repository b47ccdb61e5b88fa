//! CLI error type

use std::path::PathBuf;
use thiserror::Error;

use sales_pipeline::aggregate::AggregateError;
use sales_pipeline::pipeline::PipelineError;
use sales_pipeline::sinks::SinkError;
use sales_pipeline::store::StoreError;

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Invalid command-line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Database file does not exist
    #[error("Database not found: {0}")]
    DatabaseNotFound(PathBuf),

    /// JSON output failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CliError::Pipeline(err) => err.user_message(),
            CliError::Store(err) => err.user_message(),
            CliError::Aggregate(err) => err.user_message(),
            CliError::Sink(err) => err.user_message(),
            CliError::DatabaseNotFound(path) => {
                format!(
                    "Database not found: {}\n\nHint: Run 'sales-pipeline run' first or pass --database.",
                    path.display()
                )
            }
            _ => self.to_string(),
        }
    }
}
