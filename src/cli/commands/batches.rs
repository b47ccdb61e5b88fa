//! `batches` command: list the batch ledger

use std::path::PathBuf;

use clap::Args;

use super::open_existing_store;
use crate::error::CliError;
use crate::output::format_batches;

/// Arguments for the `batches` command
#[derive(Debug, Args)]
pub struct BatchesArgs {
    /// DuckDB database file
    #[arg(long, default_value = "output/ventas.duckdb")]
    pub database: PathBuf,

    /// Number of batches to show, most recent first
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Print the ledger as JSON
    #[arg(long)]
    pub json: bool,
}

/// Handle the `batches` command
pub fn handle_batches(args: &BatchesArgs) -> Result<(), CliError> {
    let store = open_existing_store(&args.database)?;
    let batches = store.list_batches(args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
    } else {
        print!("{}", format_batches(&batches));
    }
    Ok(())
}
