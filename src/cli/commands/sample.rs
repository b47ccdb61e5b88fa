//! `sample` command: write the demo drop file

use std::path::PathBuf;

use clap::Args;

use crate::error::CliError;
use sales_pipeline::sample::write_sample;

/// Arguments for the `sample` command
#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Directory to write the drop file into
    #[arg(long, default_value = "data/drops")]
    pub dir: PathBuf,

    /// Overwrite an existing sample file
    #[arg(long)]
    pub force: bool,
}

/// Handle the `sample` command
pub fn handle_sample(args: &SampleArgs) -> Result<(), CliError> {
    let (path, written) = write_sample(&args.dir, args.force)?;
    if written {
        println!("Generated: {}", path.display());
    } else {
        println!(
            "Kept existing {} (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}
