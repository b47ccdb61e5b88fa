//! Aggregation over the canonical dataset
//!
//! Consumers read the canonical table either through a
//! [`CanonicalReader`] or from the Parquet snapshot; both yield
//! [`CleanRecord`](crate::models::CleanRecord)s that feed [`summarize`].

pub mod summary;

use std::path::Path;

pub use summary::{
    DailyTotal, Period, ProductShare, ReasonCount, SalesSummary, SummaryOptions, summarize,
};

use crate::sinks::{SinkError, read_quarantine, read_snapshot};
use crate::store::{CanonicalReader, SalesFilter, StoreError};

/// Summarize the rows of `reader` selected by `filter`
pub fn summarize_store<R: CanonicalReader + ?Sized>(
    reader: &R,
    filter: &SalesFilter,
    quarantine_path: Option<&Path>,
    options: &SummaryOptions,
) -> Result<SalesSummary, AggregateError> {
    let records = reader.query(filter)?;
    let quarantine = match quarantine_path {
        Some(path) => read_quarantine(path)?,
        None => Vec::new(),
    };
    tracing::debug!(rows = records.len(), "Summarizing canonical table");
    Ok(summarize(&records, &quarantine, options))
}

/// Summarize a Parquet snapshot
pub fn summarize_snapshot(
    snapshot_path: &Path,
    filter: &SalesFilter,
    quarantine_path: Option<&Path>,
    options: &SummaryOptions,
) -> Result<SalesSummary, AggregateError> {
    let records: Vec<_> = read_snapshot(snapshot_path)?
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    let quarantine = match quarantine_path {
        Some(path) => read_quarantine(path)?,
        None => Vec::new(),
    };
    Ok(summarize(&records, &quarantine, options))
}

/// Errors reading the inputs of a summary
#[derive(thiserror::Error, Debug)]
pub enum AggregateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl AggregateError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            AggregateError::Store(err) => err.user_message(),
            AggregateError::Sink(err) => err.user_message(),
        }
    }
}
