//! `run` command: execute the pipeline once

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;

use crate::error::CliError;
use crate::output::format_run_report;
use sales_pipeline::pipeline::{PipelineConfig, PipelineExecutor, open_store};

/// Arguments for the `run` command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Pipeline configuration file (TOML); flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the sales drop files
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Source file glob pattern (repeatable; replaces the defaults)
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,

    /// DuckDB database file
    #[arg(long, conflicts_with = "memory")]
    pub database: Option<PathBuf>,

    /// Keep the canonical table in memory for this run only
    #[arg(long)]
    pub memory: bool,

    /// Directory for the quarantine file and the snapshot
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Batch id (a UUID is generated otherwise)
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Latest accepted sale date (defaults to today)
    #[arg(long)]
    pub run_date: Option<NaiveDate>,

    /// Validation worker threads (0 = one per core)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Validate and deduplicate without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<PipelineConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::new(),
        };

        if let Some(source) = self.source {
            config = config.with_source(source);
        }
        if !self.patterns.is_empty() {
            config = config.with_patterns(self.patterns);
        }
        if let Some(database) = self.database {
            config = config.with_database(database);
        }
        if self.memory {
            config = config.with_memory_database();
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(batch_id) = self.batch_id {
            config = config.with_batch_id(batch_id);
        }
        if let Some(run_date) = self.run_date {
            config = config.with_run_date(run_date);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.dry_run {
            config = config.with_dry_run(true);
        }

        config.validate().map_err(CliError::InvalidArgument)?;
        Ok(config)
    }
}

/// Handle the `run` command
pub fn handle_run(args: RunArgs) -> Result<(), CliError> {
    let json = args.json;
    let config = args.into_config()?;

    let store = open_store(&config)?;
    let executor = PipelineExecutor::new(config, store.as_ref())?;
    let report = executor.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_run_report(&report));
    }
    Ok(())
}
