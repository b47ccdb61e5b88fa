//! Batch pipeline
//!
//! One invocation reads the source drop, validates every row, deduplicates the valid
//! ones and commits the batch to a [`CanonicalStore`](crate::store::CanonicalStore):
//!
//! 1. **Ingest**: discover and normalize source files
//! 2. **Validate**: ordered field rules, in parallel
//! 3. **Dedup**: one record per business key, latest `ingested_at` wins
//! 4. **Persist**: raw log, keyed merge and ledger entry in one transaction
//! 5. **Output**: quarantine CSV and Parquet snapshot of the canonical table

pub mod config;
pub mod error;
pub mod executor;

pub use config::{DEFAULT_PATTERNS, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use executor::{
    Partition, PipelineExecutor, RunReport, dedup_valid, open_store, partition_records,
};
