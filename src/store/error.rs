//! Error types for the canonical store

use thiserror::Error;

/// Errors raised by a canonical store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: i32, found: i32 },

    /// A stored value could not be read back into its typed form
    #[error("Corrupt stored value in {column}: {value:?}")]
    Corrupt { column: &'static str, value: String },

    /// Store state lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StoreError::SchemaVersionMismatch { expected, found } => {
                format!(
                    "Schema version mismatch (expected v{expected}, found v{found}).\n\n\
                    Hint: The database was created by a different version; point --database at a new file."
                )
            }
            StoreError::Corrupt { column, .. } => {
                format!("{self}\n\nHint: Column '{column}' was modified outside the pipeline.")
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}
