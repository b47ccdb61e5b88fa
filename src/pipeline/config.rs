//! Pipeline configuration

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::{PipelineError, PipelineResult};
use crate::validation::ValidationLimits;

/// Default source file patterns, read in this order
pub const DEFAULT_PATTERNS: [&str; 3] = ["*.csv", "*.ndjson", "*.jsonl"];

/// Configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the sales drop files
    pub source_dir: PathBuf,

    /// Glob patterns for source files, relative to `source_dir`
    pub patterns: Vec<String>,

    /// DuckDB database file; `None` keeps the canonical store in memory
    pub database: Option<PathBuf>,

    /// Quarantine CSV, replaced on every run
    pub quarantine_path: PathBuf,

    /// Parquet snapshot of the canonical table, replaced on every run
    pub snapshot_path: PathBuf,

    /// Batch id override (a UUID is generated otherwise)
    pub batch_id: Option<String>,

    /// Upper bound for sale dates; today if unset
    pub run_date: Option<NaiveDate>,

    /// Validation worker threads; 0 uses the rayon default
    pub workers: usize,

    /// Validate and deduplicate without touching the store or the output files
    pub dry_run: bool,

    /// Validation bounds
    pub limits: ValidationLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data/drops"),
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            database: Some(PathBuf::from("output/ventas.duckdb")),
            quarantine_path: PathBuf::from("output/quality/ventas_invalidas.csv"),
            snapshot_path: PathBuf::from("output/parquet/clean_ventas.parquet"),
            batch_id: None,
            run_date: None,
            workers: 0,
            dry_run: false,
            limits: ValidationLimits::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file; missing keys take their defaults
    pub fn from_toml_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io_with_path(path, "reading config", e))?;
        toml::from_str(&content).map_err(|e| {
            PipelineError::ConfigError(format!("{}: {e}", path.display()))
        })
    }

    /// Set the source directory
    pub fn with_source(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Set the database file
    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Keep the canonical store in memory
    pub fn with_memory_database(mut self) -> Self {
        self.database = None;
        self
    }

    /// Put the quarantine file and the snapshot under `dir`
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.quarantine_path = dir.join("quality").join("ventas_invalidas.csv");
        self.snapshot_path = dir.join("parquet").join("clean_ventas.parquet");
        self
    }

    pub fn with_quarantine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.quarantine_path = path.into();
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = Some(run_date);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable dry run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Limits with the run date applied
    pub fn effective_limits(&self) -> ValidationLimits {
        let run_date = self.run_date.unwrap_or_else(|| Utc::now().date_naive());
        self.limits.clone().with_run_date(run_date)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.patterns.is_empty() {
            return Err("At least one source pattern is required".to_string());
        }
        if self.patterns.iter().any(|p| p.trim().is_empty()) {
            return Err("Source patterns must not be empty".to_string());
        }
        if self.quarantine_path == self.snapshot_path {
            return Err("Quarantine file and snapshot must be different paths".to_string());
        }
        if self.batch_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err("Batch id must not be empty".to_string());
        }
        self.effective_limits().validate()
    }
}
