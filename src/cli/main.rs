//! sales-pipeline command-line interface

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use commands::batches::{BatchesArgs, handle_batches};
use commands::run::{RunArgs, handle_run};
use commands::sample::{SampleArgs, handle_sample};
use commands::summary::{SummaryArgs, handle_summary};
use error::CliError;

/// Validate, deduplicate and persist batches of sales records
#[derive(Debug, Parser)]
#[command(name = "sales-pipeline", version, about)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline over the source drop
    Run(RunArgs),
    /// List recorded batches
    Batches(BatchesArgs),
    /// Summarize the canonical dataset
    Summary(SummaryArgs),
    /// Write a demo drop file
    Sample(SampleArgs),
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}

fn dispatch(command: Command) -> Result<(), CliError> {
    match command {
        Command::Run(args) => handle_run(args),
        Command::Batches(args) => handle_batches(&args),
        Command::Summary(args) => handle_summary(&args),
        Command::Sample(args) => handle_sample(&args),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    if let Err(err) = dispatch(cli.command) {
        eprintln!("Error: {}", err.user_message());
        std::process::exit(1);
    }
    Ok(())
}
