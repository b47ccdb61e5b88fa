//! Sales Pipeline - batch ingestion for sales-transaction drop files
//!
//! Provides:
//! - Normalization of CSV and NDJSON/JSONL rows into raw records
//! - Field validation with machine-readable reason codes
//! - Deduplication by business key, latest ingestion wins
//! - Idempotent persistence: raw log, keyed upsert and batch ledger in one transaction
//! - Quarantine CSV and Parquet snapshot outputs
//! - Summaries over the canonical dataset

pub mod aggregate;
pub mod dedup;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod sample;
pub mod sinks;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use aggregate::{SalesSummary, SummaryOptions, summarize};
pub use dedup::{CoercionError, DedupOutcome, coerce, deduplicate};
pub use ingest::{IngestError, IngestedBatch, ingest_sources};
pub use models::{BusinessKey, CleanRecord, QuarantineRecord, RawRecord, SourceField};
pub use pipeline::{PipelineConfig, PipelineError, PipelineExecutor, RunReport};
pub use sinks::SinkError;
#[cfg(feature = "duckdb-backend")]
pub use store::DuckDbStore;
pub use store::{CanonicalReader, CanonicalStore, MemoryStore, SalesFilter, StoreError};
pub use validation::{ReasonCode, ValidationLimits, ValidationVerdict, validate};
