//! `summary` command: aggregate the canonical dataset

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use super::open_existing_store;
use crate::error::CliError;
use crate::output::format_summary;
use sales_pipeline::aggregate::{SummaryOptions, summarize_snapshot, summarize_store};
use sales_pipeline::store::SalesFilter;

/// Arguments for the `summary` command
#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// DuckDB database file
    #[arg(long, default_value = "output/ventas.duckdb")]
    pub database: PathBuf,

    /// Read the Parquet snapshot instead of the database
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Quarantine file whose reasons are summarized
    #[arg(long, default_value = "output/quality/ventas_invalidas.csv")]
    pub quarantine: PathBuf,

    /// First sale date to include
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last sale date to include
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Restrict to one product id
    #[arg(long)]
    pub product: Option<String>,

    /// Unit-price cap for the product and day breakdowns
    #[arg(long, default_value = "150", conflicts_with = "no_price_cap")]
    pub price_cap: Decimal,

    /// Include every price in the breakdowns
    #[arg(long)]
    pub no_price_cap: bool,

    /// Products listed
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Days listed
    #[arg(long, default_value_t = 20)]
    pub days: usize,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl SummaryArgs {
    fn filter(&self) -> SalesFilter {
        let mut filter = SalesFilter::all();
        if let Some(from) = self.from {
            filter = filter.with_from(from);
        }
        if let Some(to) = self.to {
            filter = filter.with_to(to);
        }
        if let Some(product) = &self.product {
            filter = filter.with_product(product.clone());
        }
        filter
    }

    fn options(&self) -> SummaryOptions {
        let cap = (!self.no_price_cap).then_some(self.price_cap);
        SummaryOptions::default()
            .with_price_cap(cap)
            .with_top_products(self.top)
            .with_days(self.days)
    }
}

/// Handle the `summary` command
pub fn handle_summary(args: &SummaryArgs) -> Result<(), CliError> {
    let filter = args.filter();
    let options = args.options();
    let quarantine = Some(args.quarantine.as_path());

    let summary = match &args.snapshot {
        Some(snapshot) => summarize_snapshot(snapshot, &filter, quarantine, &options)?,
        None => {
            let store = open_existing_store(&args.database)?;
            summarize_store(store.as_ref(), &filter, quarantine, &options)?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", format_summary(&summary));
    }
    Ok(())
}
