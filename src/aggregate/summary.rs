//! Sales summaries over canonical records

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::CleanRecord;
use crate::models::clean::AMOUNT_SCALE;
use crate::sinks::QuarantineRow;

/// Knobs for [`summarize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    /// Products listed in the top-products breakdown
    pub top_products: usize,
    /// Most recent days listed in the per-day breakdown
    pub days: usize,
    /// Rows priced above this cap are left out of the product and day breakdowns
    pub price_cap: Option<Decimal>,
    /// Quarantine reasons listed
    pub top_reasons: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            top_products: 5,
            days: 20,
            price_cap: Some(Decimal::from(150)),
            top_reasons: 3,
        }
    }
}

impl SummaryOptions {
    pub fn with_price_cap(mut self, cap: Option<Decimal>) -> Self {
        self.price_cap = cap;
        self
    }

    pub fn with_top_products(mut self, n: usize) -> Self {
        self.top_products = n;
        self
    }

    pub fn with_days(mut self, n: usize) -> Self {
        self.days = n;
        self
    }
}

/// First and last sale date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductShare {
    pub product_id: String,
    pub product_name: Option<String>,
    pub amount: Decimal,
    /// Whole-percent share of the listed products' total
    pub share_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub rows: usize,
}

/// Computed figures for a sales report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    /// Sum of line amounts over every record
    pub revenue: Decimal,
    pub transactions: usize,
    /// Revenue per transaction, 2 decimal places
    pub average_ticket: Decimal,
    pub period: Option<Period>,
    /// Product with the highest amount in the breakdown
    pub leading_product: Option<String>,
    pub top_products: Vec<ProductShare>,
    /// Most recent first
    pub daily: Vec<DailyTotal>,
    pub price_cap: Option<Decimal>,
    /// Records priced above the cap
    pub above_price_cap: usize,
    pub top_reasons: Vec<ReasonCount>,
}

/// Summarize canonical records and the quarantine rows of the last run
pub fn summarize(
    records: &[CleanRecord],
    quarantine: &[QuarantineRow],
    options: &SummaryOptions,
) -> SalesSummary {
    let revenue: Decimal = records.iter().map(|r| r.amount).sum();
    let transactions = records.len();
    let average_ticket = if transactions == 0 {
        Decimal::ZERO
    } else {
        (revenue / Decimal::from(transactions))
            .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
    };

    let period = records
        .iter()
        .map(|r| r.date)
        .min()
        .zip(records.iter().map(|r| r.date).max())
        .map(|(start, end)| Period { start, end });

    let within_cap = |r: &&CleanRecord| options.price_cap.is_none_or(|cap| r.unit_price <= cap);
    let capped: Vec<&CleanRecord> = records.iter().filter(within_cap).collect();
    let above_price_cap = records.len() - capped.len();

    let top_products = top_products(&capped, options.top_products);
    let leading_product = top_products.first().map(|p| p.product_id.clone());

    SalesSummary {
        revenue,
        transactions,
        average_ticket,
        period,
        leading_product,
        top_products,
        daily: daily_totals(&capped, options.days),
        price_cap: options.price_cap,
        above_price_cap,
        top_reasons: top_reasons(quarantine, options.top_reasons),
    }
}

fn top_products(records: &[&CleanRecord], limit: usize) -> Vec<ProductShare> {
    let mut by_product: BTreeMap<&str, (Option<&str>, Decimal)> = BTreeMap::new();
    for record in records {
        let entry = by_product
            .entry(record.product_id.as_str())
            .or_insert((None, Decimal::ZERO));
        if entry.0.is_none() {
            entry.0 = record.product_name.as_deref();
        }
        entry.1 += record.amount;
    }

    let mut ranked: Vec<_> = by_product.into_iter().collect();
    // BTreeMap order makes the product id the tie-break
    ranked.sort_by(|a, b| b.1.1.cmp(&a.1.1));
    ranked.truncate(limit);

    let listed_total: Decimal = ranked.iter().map(|(_, (_, amount))| *amount).sum();
    let denominator = if listed_total.is_zero() {
        Decimal::ONE
    } else {
        listed_total
    };

    ranked
        .into_iter()
        .map(|(product_id, (name, amount))| ProductShare {
            product_id: product_id.to_string(),
            product_name: name.map(str::to_string),
            amount,
            share_pct: (amount * Decimal::ONE_HUNDRED / denominator).round(),
        })
        .collect()
}

fn daily_totals(records: &[&CleanRecord], limit: usize) -> Vec<DailyTotal> {
    let mut by_day: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_day.entry(record.date).or_insert((Decimal::ZERO, 0));
        entry.0 += record.amount;
        entry.1 += 1;
    }
    by_day
        .into_iter()
        .rev()
        .take(limit)
        .map(|(date, (amount, transactions))| DailyTotal {
            date,
            amount,
            transactions,
        })
        .collect()
}

fn top_reasons(rows: &[QuarantineRow], limit: usize) -> Vec<ReasonCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for reason in rows.iter().flat_map(|row| row.reason_list()) {
        *counts.entry(reason).or_default() += 1;
    }

    let mut ranked: Vec<ReasonCount> = counts
        .into_iter()
        .map(|(reason, rows)| ReasonCount { reason, rows })
        .collect();
    ranked.sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.reason.cmp(&b.reason)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::str::FromStr;

    fn sale(day: u32, client: &str, product: &str, units: u32, price: &str) -> CleanRecord {
        let ts = DateTime::parse_from_rfc3339("2025-01-06T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        CleanRecord::try_new(
            NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            client,
            product,
            None,
            units,
            Decimal::from_str(price).unwrap(),
            ts,
        )
        .unwrap()
    }

    fn quarantine_row(reasons: &str) -> QuarantineRow {
        QuarantineRow {
            fecha: String::new(),
            id_cliente: String::new(),
            id_producto: String::new(),
            unidades: String::new(),
            precio_unitario: String::new(),
            origin_file: "ventas.csv".to_string(),
            ingested_at: String::new(),
            reasons: reasons.to_string(),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_summary_of_example_batch() {
        let records = vec![
            sale(3, "C001", "P010", 2, "12.50"),
            sale(4, "C001", "P020", 3, "8.00"),
            sale(4, "C002", "P010", 1, "12.50"),
        ];

        let summary = summarize(&records, &[], &SummaryOptions::default());

        assert_eq!(summary.revenue, dec("61.50"));
        assert_eq!(summary.transactions, 3);
        assert_eq!(summary.average_ticket, dec("20.50"));
        assert_eq!(
            summary.period,
            Some(Period {
                start: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
            })
        );
        assert_eq!(summary.leading_product.as_deref(), Some("P010"));
        assert_eq!(summary.top_products[0].amount, dec("37.50"));
        assert_eq!(summary.top_products[0].share_pct, dec("61"));
        assert_eq!(summary.top_products[1].share_pct, dec("39"));
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
        assert_eq!(summary.daily[0].transactions, 2);
        assert_eq!(summary.daily[0].amount, dec("36.50"));
    }

    #[test]
    fn test_price_cap_filters_breakdowns_only() {
        let records = vec![
            sale(3, "C001", "P010", 1, "10"),
            sale(3, "C002", "P099", 1, "500"),
        ];

        let summary = summarize(&records, &[], &SummaryOptions::default());
        assert_eq!(summary.revenue, dec("510"));
        assert_eq!(summary.above_price_cap, 1);
        assert_eq!(summary.top_products.len(), 1);
        assert_eq!(summary.daily[0].transactions, 1);

        let uncapped = summarize(
            &records,
            &[],
            &SummaryOptions::default().with_price_cap(None),
        );
        assert_eq!(uncapped.above_price_cap, 0);
        assert_eq!(uncapped.leading_product.as_deref(), Some("P099"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], &[], &SummaryOptions::default());
        assert_eq!(summary.revenue, Decimal::ZERO);
        assert_eq!(summary.average_ticket, Decimal::ZERO);
        assert_eq!(summary.period, None);
        assert_eq!(summary.leading_product, None);
        assert!(summary.daily.is_empty());
    }

    #[test]
    fn test_top_reasons_split_compound_rows() {
        let rows = vec![
            quarantine_row("units non-positive"),
            quarantine_row("units zero; price negative"),
            quarantine_row("units non-positive; price negative"),
            quarantine_row("client id missing"),
        ];

        let summary = summarize(&[], &rows, &SummaryOptions::default());
        assert_eq!(
            summary.top_reasons,
            vec![
                ReasonCount {
                    reason: "price negative".to_string(),
                    rows: 2
                },
                ReasonCount {
                    reason: "units non-positive".to_string(),
                    rows: 2
                },
                ReasonCount {
                    reason: "client id missing".to_string(),
                    rows: 1
                },
            ]
        );
    }

    #[test]
    fn test_day_limit_keeps_most_recent() {
        let records: Vec<_> = (1..=5)
            .map(|day| sale(day, "C001", "P010", 1, "1"))
            .collect();
        let summary = summarize(&records, &[], &SummaryOptions::default().with_days(2));
        let days: Vec<u32> = summary
            .daily
            .iter()
            .map(|d| chrono::Datelike::day(&d.date))
            .collect();
        assert_eq!(days, vec![5, 4]);
    }
}
