//! Output formatting for CLI

use sales_pipeline::aggregate::SalesSummary;
use sales_pipeline::pipeline::RunReport;
use sales_pipeline::store::BatchRecord;

/// Format the result of a pipeline run
pub fn format_run_report(report: &RunReport) -> String {
    let mut output = String::new();

    if report.dry_run {
        output.push_str("Dry run: nothing was written\n");
    }
    output.push_str(&format!("Batch:        {}\n", report.batch_id));
    output.push_str(&format!("Files:        {}\n", report.files));
    output.push_str(&format!("Raw:          {}\n", report.counts.raw));
    output.push_str(&format!("Valid:        {}\n", report.counts.valid));
    output.push_str(&format!(
        "Duplicates:   {} dropped\n",
        report.counts.duplicates_dropped
    ));
    if !report.dry_run {
        output.push_str(&format!(
            "Upserted:     {} ({} inserted, {} updated, {} unchanged)\n",
            report.counts.upserted(),
            report.counts.inserted,
            report.counts.updated,
            report.unchanged
        ));
    }
    output.push_str(&format!("Quarantined:  {}\n", report.counts.quarantined));
    output.push_str(&format!("Canonical:    {} rows\n", report.canonical_rows));

    if let Some(previous) = &report.rerun_of {
        output.push_str(&format!("Re-run of:    {previous} (identical sources)\n"));
    }
    if let Some(path) = &report.quarantine_path {
        output.push_str(&format!("Quarantine:   {}\n", path.display()));
    }
    if let Some(path) = &report.snapshot_path {
        output.push_str(&format!("Snapshot:     {}\n", path.display()));
    }
    output.push_str(&format!("Duration:     {}\n", report.duration_formatted()));

    output
}

/// Format ledger entries as a table
pub fn format_batches(batches: &[BatchRecord]) -> String {
    if batches.is_empty() {
        return "No batches recorded\n".to_string();
    }

    let mut output = format!(
        "{:<36}  {:<9}  {:<20}  {:>6}  {:>6}  {:>6}  {:>8}\n",
        "BATCH", "STATUS", "STARTED", "RAW", "VALID", "QUAR", "UPSERTED"
    );
    for batch in batches {
        output.push_str(&format!(
            "{:<36}  {:<9}  {:<20}  {:>6}  {:>6}  {:>6}  {:>8}\n",
            batch.id,
            batch.status,
            batch.started_at.format("%Y-%m-%d %H:%M:%S"),
            batch.counts.raw,
            batch.counts.valid,
            batch.counts.quarantined,
            batch.counts.upserted()
        ));
        if let Some(error) = &batch.error_message {
            output.push_str(&format!("  error: {error}\n"));
        }
    }
    output
}

/// Format a sales summary as plain text
pub fn format_summary(summary: &SalesSummary) -> String {
    let mut output = String::new();

    match &summary.period {
        Some(period) => {
            output.push_str(&format!("Period:        {} to {}\n", period.start, period.end))
        }
        None => output.push_str("Period:        (no data)\n"),
    }
    output.push_str(&format!("Revenue:       {:.2}\n", summary.revenue));
    output.push_str(&format!("Transactions:  {}\n", summary.transactions));
    output.push_str(&format!("Average ticket: {:.2}\n", summary.average_ticket));
    if let Some(product) = &summary.leading_product {
        output.push_str(&format!("Leading product: {product}\n"));
    }

    output.push_str("\nTop products:\n");
    if summary.top_products.is_empty() {
        output.push_str("  (no data)\n");
    }
    for product in &summary.top_products {
        let name = product.product_name.as_deref().unwrap_or("-");
        output.push_str(&format!(
            "  {:<6} {:<24} {:>12.2} {:>4}%\n",
            product.product_id, name, product.amount, product.share_pct
        ));
    }

    output.push_str("\nBy day:\n");
    if summary.daily.is_empty() {
        output.push_str("  (no data)\n");
    }
    for day in &summary.daily {
        output.push_str(&format!(
            "  {}  {:>12.2}  {:>4} transactions\n",
            day.date, day.amount, day.transactions
        ));
    }

    if let Some(cap) = summary.price_cap {
        output.push_str(&format!(
            "\n{} row(s) priced above {cap} left out of the breakdowns\n",
            summary.above_price_cap
        ));
    }

    output.push_str("\nTop quarantine reasons:\n");
    if summary.top_reasons.is_empty() {
        output.push_str("  (no quarantined rows)\n");
    }
    for reason in &summary.top_reasons {
        output.push_str(&format!("  - {}: {} rows\n", reason.reason, reason.rows));
    }

    output
}
