//! Pipeline executor for one sales batch

use std::path::PathBuf;
use std::time::Instant;

use chrono::{SubsecRound, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};

use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use crate::dedup::{DedupOutcome, coerce, deduplicate};
use crate::ingest::ingest_sources;
use crate::models::{CleanRecord, QuarantineRecord, RawRecord};
use crate::sinks::{write_quarantine, write_snapshot};
use crate::store::{BatchCounts, BatchRecord, CanonicalStore, SalesFilter, StoreError};
use crate::validation::{ValidationLimits, ValidationVerdict, validate};

/// Open the store a config points at.
///
/// A configured database file needs the `duckdb-backend` feature; without a
/// database the canonical table lives in memory for the run.
pub fn open_store(config: &PipelineConfig) -> PipelineResult<Box<dyn CanonicalStore>> {
    match &config.database {
        None => Ok(Box::new(crate::store::MemoryStore::new())),
        #[cfg(feature = "duckdb-backend")]
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::io_with_path(parent, "creating database directory", e)
                })?;
            }
            let store = crate::store::DuckDbStore::open(&path.to_string_lossy())?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "duckdb-backend"))]
        Some(path) => Err(PipelineError::ConfigError(format!(
            "database {} requires the duckdb-backend feature",
            path.display()
        ))),
    }
}

/// Valid and invalid rows of a batch, each in input order
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub valid: Vec<RawRecord>,
    pub quarantined: Vec<QuarantineRecord>,
}

/// Validate every record on a pool of `workers` threads (0 = rayon default).
///
/// Every input record lands in exactly one side of the partition, and both sides
/// keep input order.
pub fn partition_records(
    records: &[RawRecord],
    limits: &ValidationLimits,
    workers: usize,
) -> PipelineResult<Partition> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;
    let verdicts: Vec<ValidationVerdict> =
        pool.install(|| records.par_iter().map(|r| validate(r, limits)).collect());

    let mut partition = Partition::default();
    for (record, verdict) in records.iter().zip(verdicts) {
        if verdict.is_valid {
            partition.valid.push(record.clone());
        } else {
            partition
                .quarantined
                .push(QuarantineRecord::new(record.clone(), verdict.reasons));
        }
    }
    Ok(partition)
}

/// Coerce the valid rows and collapse them to one record per business key
pub fn dedup_valid(valid: &[RawRecord]) -> PipelineResult<DedupOutcome> {
    let clean = valid
        .iter()
        .map(coerce)
        .collect::<Result<Vec<CleanRecord>, _>>()?;
    Ok(deduplicate(clean))
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Batch ID
    pub batch_id: String,
    pub source_digest: String,
    /// Number of source files read
    pub files: usize,
    pub counts: BatchCounts,
    /// Deduplicated records that left the canonical table untouched
    pub unchanged: u64,
    /// Rows in the canonical table after the run
    pub canonical_rows: usize,
    /// Earlier completed batch that read identical sources
    pub rerun_of: Option<String>,
    pub dry_run: bool,
    pub quarantine_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// One-line per-bucket summary
    pub fn summary_line(&self) -> String {
        format!(
            "raw={} valid={} duplicates_dropped={} upserted={} quarantined={}",
            self.counts.raw,
            self.counts.valid,
            self.counts.duplicates_dropped,
            self.counts.upserted(),
            self.counts.quarantined
        )
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        if mins > 0 {
            format!("{}m {}s", mins, secs % 60)
        } else {
            format!("{}.{:03}s", secs, self.duration_ms % 1000)
        }
    }
}

/// Runs ingest, validation, deduplication, persistence and the output sinks
pub struct PipelineExecutor<'s> {
    config: PipelineConfig,
    store: &'s dyn CanonicalStore,
}

impl<'s> PipelineExecutor<'s> {
    /// Create an executor; the store is initialized unless this is a dry run
    pub fn new(config: PipelineConfig, store: &'s dyn CanonicalStore) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;
        if !config.dry_run {
            store.init()?;
        }
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline once
    pub fn run(&self) -> PipelineResult<RunReport> {
        let started_at = Utc::now().trunc_subsecs(6);
        let batch_id = self
            .config
            .batch_id
            .clone()
            .unwrap_or_else(BatchRecord::generate_id);
        let mut batch = BatchRecord::new(
            batch_id,
            self.config.source_dir.display().to_string(),
            started_at,
        );

        let _span = info_span!(
            "pipeline_run",
            batch_id = %batch.id,
            dry_run = self.config.dry_run
        )
        .entered();
        info!(source = %self.config.source_dir.display(), "Starting pipeline");

        let start = Instant::now();
        match self.execute(&mut batch) {
            Ok(mut report) => {
                report.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    duration_ms = report.duration_ms,
                    summary = %report.summary_line(),
                    "Pipeline completed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(stage = e.stage_name().unwrap_or("config"), error = %e, "Pipeline failed");
                self.record_failure(&mut batch, &e);
                Err(e)
            }
        }
    }

    /// Best-effort ledger entry for a batch that never committed
    fn record_failure(&self, batch: &mut BatchRecord, err: &PipelineError) {
        if self.config.dry_run || batch.is_completed() {
            return;
        }
        batch.fail(&err.to_string());
        if let Err(ledger_err) = self.store.record_failed_batch(batch) {
            warn!(error = %ledger_err, "Could not record failed batch");
        }
    }

    fn execute(&self, batch: &mut BatchRecord) -> PipelineResult<RunReport> {
        let ingested = {
            let _stage = info_span!("pipeline_stage", stage = "ingest").entered();
            ingest_sources(
                &self.config.source_dir,
                &self.config.patterns,
                batch.started_at,
            )?
        };
        batch.source_digest = ingested.source_digest.clone();
        batch.files_total = ingested.files.len() as u64;
        batch.counts.raw = ingested.records.len() as u64;
        debug!(
            files = ingested.stats.files_processed,
            bytes = ingested.stats.bytes_processed,
            rows_per_sec = ingested.stats.throughput(),
            "Ingest complete"
        );

        let partition = {
            let _stage = info_span!("pipeline_stage", stage = "validate").entered();
            let limits = self.config.effective_limits();
            partition_records(&ingested.records, &limits, self.config.workers)?
        };
        batch.counts.valid = partition.valid.len() as u64;
        batch.counts.quarantined = partition.quarantined.len() as u64;
        info!(
            valid = batch.counts.valid,
            quarantined = batch.counts.quarantined,
            "Validation complete"
        );

        let outcome = {
            let _stage = info_span!("pipeline_stage", stage = "dedup").entered();
            dedup_valid(&partition.valid)?
        };
        batch.counts.duplicates_dropped = outcome.duplicates_dropped as u64;
        info!(
            records = outcome.records.len(),
            duplicates_dropped = outcome.duplicates_dropped,
            "Deduplication complete"
        );

        let mut report = RunReport {
            batch_id: batch.id.clone(),
            source_digest: batch.source_digest.clone(),
            files: ingested.files.len(),
            counts: batch.counts,
            unchanged: 0,
            canonical_rows: outcome.records.len(),
            rerun_of: None,
            dry_run: self.config.dry_run,
            quarantine_path: None,
            snapshot_path: None,
            duration_ms: 0,
        };

        if self.config.dry_run {
            info!("Dry run: store and output files left untouched");
            return Ok(report);
        }

        {
            let _stage = info_span!("pipeline_stage", stage = "persist").entered();
            report.rerun_of = self.previous_run(&batch.source_digest)?;
            let stats = self
                .store
                .commit_batch(batch, &ingested.records, &outcome.records)?;
            report.counts = batch.counts;
            report.unchanged = stats.unchanged;
            info!(
                inserted = stats.inserted,
                updated = stats.updated,
                unchanged = stats.unchanged,
                "Batch committed"
            );
        }

        {
            let _stage = info_span!("pipeline_stage", stage = "output").entered();
            write_quarantine(&self.config.quarantine_path, &partition.quarantined)?;
            let canonical = self.store.query(&SalesFilter::all())?;
            write_snapshot(&self.config.snapshot_path, &canonical)?;
            report.canonical_rows = canonical.len();
            report.quarantine_path = Some(self.config.quarantine_path.clone());
            report.snapshot_path = Some(self.config.snapshot_path.clone());
        }

        Ok(report)
    }

    fn previous_run(&self, digest: &str) -> Result<Option<String>, StoreError> {
        let previous = self.store.find_completed_by_digest(digest)?;
        if let Some(previous) = &previous {
            info!(
                previous_batch = %previous.id,
                "Sources identical to an earlier batch; re-applying"
            );
        }
        Ok(previous.map(|b| b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceField;
    use crate::store::{CanonicalReader, MemoryStore};
    use crate::validation::ReasonCode;
    use chrono::{DateTime, NaiveDate};
    use std::fs;
    use tempfile::TempDir;

    fn limits() -> ValidationLimits {
        ValidationLimits::default().with_run_date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap())
    }

    fn raw(client: &str, units: &str) -> RawRecord {
        let ts = DateTime::parse_from_rfc3339("2025-01-06T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut record = RawRecord::new("ventas.csv", ts);
        record.set(SourceField::Date, "2025-01-04".to_string());
        record.set(SourceField::ClientId, client.to_string());
        record.set(SourceField::ProductId, "P010".to_string());
        record.set(SourceField::Units, units.to_string());
        record.set(SourceField::UnitPrice, "12.50".to_string());
        record
    }

    #[test]
    fn test_partition_keeps_every_row_in_order() {
        let records = vec![
            raw("C001", "1"),
            raw("C002", "0"),
            raw("C003", "2"),
            raw("X", "abc"),
            raw("C005", "3"),
        ];

        let partition = partition_records(&records, &limits(), 2).unwrap();

        assert_eq!(partition.valid.len() + partition.quarantined.len(), records.len());
        let valid: Vec<_> = partition.valid.iter().map(|r| r.client_id.as_str()).collect();
        assert_eq!(valid, vec!["C001", "C003", "C005"]);
        assert_eq!(partition.quarantined[0].reasons, vec![ReasonCode::UnitsZero]);
        assert_eq!(
            partition.quarantined[1].reasons,
            vec![ReasonCode::ClientIdMalformed, ReasonCode::UnitsNonNumeric]
        );
    }

    #[test]
    fn test_dedup_valid_collapses_keys() {
        let outcome = dedup_valid(&[raw("C001", "1"), raw("C001", "4")]).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].units, 4);
        assert_eq!(outcome.duplicates_dropped, 1);
    }

    #[test]
    fn test_run_report_summary_line() {
        let report = RunReport {
            batch_id: "demo".to_string(),
            source_digest: String::new(),
            files: 1,
            counts: BatchCounts {
                raw: 6,
                valid: 5,
                quarantined: 1,
                duplicates_dropped: 1,
                inserted: 3,
                updated: 1,
            },
            unchanged: 0,
            canonical_rows: 4,
            rerun_of: None,
            dry_run: false,
            quarantine_path: None,
            snapshot_path: None,
            duration_ms: 1_250,
        };
        assert_eq!(
            report.summary_line(),
            "raw=6 valid=5 duplicates_dropped=1 upserted=4 quarantined=1"
        );
        assert_eq!(report.duration_formatted(), "1.250s");
    }

    #[test]
    fn test_dry_run_leaves_store_and_outputs_untouched() {
        let dir = TempDir::new().unwrap();
        let drops = dir.path().join("drops");
        fs::create_dir(&drops).unwrap();
        fs::write(
            drops.join("ventas.csv"),
            "fecha,id_cliente,id_producto,unidades,precio_unitario\n2025-01-04,C001,P010,1,2\n",
        )
        .unwrap();

        let store = MemoryStore::new();
        let config = PipelineConfig::new()
            .with_source(&drops)
            .with_memory_database()
            .with_output_dir(dir.path().join("output"))
            .with_run_date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap())
            .with_dry_run(true);
        let report = PipelineExecutor::new(config, &store).unwrap().run().unwrap();

        assert!(report.dry_run);
        assert_eq!(report.counts.valid, 1);
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.list_batches(10).unwrap().is_empty());
        assert!(!dir.path().join("output").exists());
    }

    #[test]
    fn test_missing_source_records_failed_batch() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let config = PipelineConfig::new()
            .with_source(dir.path().join("missing"))
            .with_memory_database()
            .with_output_dir(dir.path())
            .with_batch_id("broken");

        let err = PipelineExecutor::new(config, &store).unwrap().run().unwrap_err();
        assert_eq!(err.stage_name(), Some("ingest"));

        let batches = store.list_batches(10).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].id, "broken");
        assert_eq!(batches[0].status, crate::store::BatchStatus::Failed);
        assert!(batches[0].error_message.is_some());
    }
}
