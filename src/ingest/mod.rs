//! Record normalization for sales drop files
//!
//! Discovers CSV and NDJSON/JSONL files under a source directory and turns every
//! row into a [`RawRecord`] carrying its origin file and ingestion timestamp.
//! No row is dropped here; defects in row content are left to validation.

pub mod delimited;
pub mod discover;
pub mod error;
pub mod jsonl;

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub use delimited::read_csv_file;
pub use discover::{DiscoveredFile, discover_local_files, discover_sources, source_digest};
pub use error::IngestError;
pub use jsonl::read_jsonl_file;

use crate::models::RawRecord;

/// Column or key names that carry a per-row ingestion timestamp
const TIMESTAMP_COLUMNS: [&str; 2] = ["ingested_at", "_ingest_ts"];

pub(crate) fn is_timestamp_column(name: &str) -> bool {
    let name = name.trim();
    TIMESTAMP_COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Parse a per-row RFC 3339 timestamp at microsecond precision.
///
/// Unparseable values fall back to the batch time.
pub(crate) fn row_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(6))
}

/// Supported source formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Jsonl,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "jsonl" | "ndjson" => Some(SourceFormat::Jsonl),
            _ => None,
        }
    }
}

/// Read one source file
pub fn read_source_file(
    file: &DiscoveredFile,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<RawRecord>, IngestError> {
    let origin = file.origin_name();
    match SourceFormat::from_path(&file.path) {
        Some(SourceFormat::Csv) => read_csv_file(&file.path, &origin, ingested_at),
        Some(SourceFormat::Jsonl) => read_jsonl_file(&file.path, &origin, ingested_at),
        None => Err(IngestError::UnsupportedExtension(file.path.clone())),
    }
}

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Number of files read
    pub files_processed: usize,
    /// Number of rows read
    pub records_ingested: usize,
    /// Total bytes read
    pub bytes_processed: u64,
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Rows per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_ingested as f64 / secs
        }
    }
}

/// All rows of one invocation, in file order then row order
#[derive(Debug, Clone)]
pub struct IngestedBatch {
    pub records: Vec<RawRecord>,
    pub files: Vec<DiscoveredFile>,
    /// Digest over every file's name and content
    pub source_digest: String,
    pub stats: IngestStats,
}

/// Discover and read every source file under `source_dir`.
///
/// Any file defect aborts the whole read; rows are never silently skipped.
pub fn ingest_sources(
    source_dir: &Path,
    patterns: &[String],
    ingested_at: DateTime<Utc>,
) -> Result<IngestedBatch, IngestError> {
    let start = Instant::now();
    let mut files = discover_sources(source_dir, patterns)?;
    if files.is_empty() {
        tracing::warn!(source = %source_dir.display(), "No source files matched");
    }

    let mut stats = IngestStats::default();
    let mut records = Vec::new();
    for file in &files {
        let rows = read_source_file(file, ingested_at)?;
        tracing::info!(file = %file.origin_name(), rows = rows.len(), "Ingested source file");
        stats.files_processed += 1;
        stats.bytes_processed += file.size;
        stats.records_ingested += rows.len();
        records.extend(rows);
    }

    let source_digest = source_digest(&mut files)?;
    stats.duration = start.elapsed();

    Ok(IngestedBatch {
        records,
        files,
        source_digest,
        stats,
    })
}
