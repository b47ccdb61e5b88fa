//! Canonical store abstraction
//!
//! Defines the read contract consumed by aggregation ([`CanonicalReader`]), the
//! write contract used by the pipeline ([`CanonicalStore`]) and their backends:
//! - [`MemoryStore`]: in-process state, always available
//! - [`DuckDbStore`]: embedded DuckDB database (feature `duckdb-backend`)

pub mod batch;
pub mod error;
pub mod memory;
pub mod schema;

#[cfg(feature = "duckdb-backend")]
pub mod db;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use batch::{BatchCounts, BatchRecord, BatchStatus};
#[cfg(feature = "duckdb-backend")]
pub use db::DuckDbStore;
pub use error::StoreError;
pub use memory::MemoryStore;

use crate::models::{BusinessKey, CleanRecord, RawRecord};

/// Selection over the canonical table; unset bounds match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFilter {
    /// Inclusive lower date bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub to: Option<NaiveDate>,
    pub product_id: Option<String>,
}

impl SalesFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_from(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn matches(&self, record: &CleanRecord) -> bool {
        self.from.is_none_or(|from| record.date >= from)
            && self.to.is_none_or(|to| record.date <= to)
            && self
                .product_id
                .as_deref()
                .is_none_or(|product| record.product_id == product)
    }
}

/// Read access to the canonical table
pub trait CanonicalReader: Send + Sync {
    /// Fetch the row for one business key
    fn get(&self, key: &BusinessKey) -> Result<Option<CleanRecord>, StoreError>;

    /// Rows matching `filter`, ordered by business key
    fn query(&self, filter: &SalesFilter) -> Result<Vec<CleanRecord>, StoreError>;

    /// Number of rows in the canonical table
    fn count(&self) -> Result<usize, StoreError>;
}

/// Durable store for one batch at a time: raw log, keyed table and batch ledger
pub trait CanonicalStore: CanonicalReader {
    /// Create tables if needed and check the schema version
    fn init(&self) -> Result<(), StoreError>;

    /// Append `raw` to the raw log, merge `clean` into the keyed table and write
    /// the completed ledger entry for `batch`, all in one transaction.
    ///
    /// On success `batch` is marked completed with its merge counts filled in. On
    /// error nothing from the batch is visible.
    fn commit_batch(
        &self,
        batch: &mut BatchRecord,
        raw: &[RawRecord],
        clean: &[CleanRecord],
    ) -> Result<MergeStats, StoreError>;

    /// Record a failed batch in the ledger, outside any batch transaction
    fn record_failed_batch(&self, batch: &BatchRecord) -> Result<(), StoreError>;

    /// Most recent batches first
    fn list_batches(&self, limit: usize) -> Result<Vec<BatchRecord>, StoreError>;

    /// Latest completed batch that read sources with this digest
    fn find_completed_by_digest(&self, digest: &str) -> Result<Option<BatchRecord>, StoreError>;

    /// Number of entries in the raw log
    fn raw_log_count(&self) -> Result<usize, StoreError>;
}

/// What a merge does with one incoming record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    Insert,
    Update,
    /// Identical values already stored, or the incoming record is older
    Unchanged,
}

/// Decide how `incoming` merges over the currently stored row.
///
/// Re-applying identical values never touches the row (its `ingested_at` is kept),
/// and an older record never overwrites a newer one.
pub fn merge_action(existing: Option<&CleanRecord>, incoming: &CleanRecord) -> MergeAction {
    match existing {
        None => MergeAction::Insert,
        Some(current) if incoming.ingested_at < current.ingested_at => MergeAction::Unchanged,
        Some(current) if current.same_values(incoming) => MergeAction::Unchanged,
        Some(_) => MergeAction::Update,
    }
}

/// Outcome of merging one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
}

impl MergeStats {
    pub fn record(&mut self, action: MergeAction) {
        match action {
            MergeAction::Insert => self.inserted += 1,
            MergeAction::Update => self.updated += 1,
            MergeAction::Unchanged => self.unchanged += 1,
        }
    }
}

/// Fixed-width UTC text for stored timestamps, so text order is time order
pub fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(
    column: &'static str,
    text: &str,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt {
            column,
            value: text.to_string(),
        })
}
