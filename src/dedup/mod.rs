//! Coercion of validated rows and deduplication by business key

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use crate::models::{BusinessKey, CleanRecord, RawRecord};
use crate::validation::{parse_date, parse_decimal, parse_units};

/// A validated row that could not be converted to a [`CleanRecord`].
///
/// Validation accepts only rows that coerce, so this is an internal defect.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Validated record from {origin_file} has uncoercible {field}: {value:?}")]
pub struct CoercionError {
    pub origin_file: String,
    pub field: &'static str,
    pub value: String,
}

impl CoercionError {
    fn new(raw: &RawRecord, field: &'static str, value: &str) -> Self {
        Self {
            origin_file: raw.origin_file.clone(),
            field,
            value: value.to_string(),
        }
    }
}

/// Convert a record that passed validation into its typed form
pub fn coerce(raw: &RawRecord) -> Result<CleanRecord, CoercionError> {
    let date =
        parse_date(&raw.date_text).ok_or_else(|| CoercionError::new(raw, "date", &raw.date_text))?;
    let units = parse_units(&raw.units_text)
        .and_then(|u| u.to_u32())
        .filter(|u| *u > 0)
        .ok_or_else(|| CoercionError::new(raw, "units", &raw.units_text))?;
    let unit_price = parse_decimal(&raw.price_text)
        .filter(|p| !p.is_sign_negative() || p.is_zero())
        .ok_or_else(|| CoercionError::new(raw, "unit price", &raw.price_text))?;

    let product_name = Some(raw.product_name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    CleanRecord::try_new(
        date,
        raw.client_id.trim(),
        raw.product_id.trim(),
        product_name,
        units,
        unit_price.abs(),
        raw.ingested_at,
    )
    .ok_or_else(|| {
        CoercionError::new(
            raw,
            "amount",
            &format!("{} * {}", raw.units_text, raw.price_text),
        )
    })
}

/// Result of collapsing a batch to one record per business key
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Winners, ordered by business key
    pub records: Vec<CleanRecord>,
    /// Records superseded by a later copy of the same key
    pub duplicates_dropped: usize,
}

/// Keep one record per business key.
///
/// The record with the latest `ingested_at` wins; on equal timestamps the one
/// appearing later in `records` wins. Losers are dropped, not quarantined.
pub fn deduplicate(records: impl IntoIterator<Item = CleanRecord>) -> DedupOutcome {
    let mut winners: BTreeMap<BusinessKey, CleanRecord> = BTreeMap::new();
    let mut duplicates_dropped = 0;

    for record in records {
        let key = record.key();
        match winners.get_mut(&key) {
            Some(current) => {
                duplicates_dropped += 1;
                if record.ingested_at >= current.ingested_at {
                    *current = record;
                }
            }
            None => {
                winners.insert(key, record);
            }
        }
    }

    DedupOutcome {
        records: winners.into_values().collect(),
        duplicates_dropped,
    }
}
