//! Field rules for raw sales records

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::parse::{parse_date, parse_decimal, parse_units};
use crate::models::RawRecord;

static CLIENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^C\d{3}$").expect("valid regex"));
static PRODUCT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^P\d{3}$").expect("valid regex"));

/// Separator used when reasons are persisted as text
pub const REASON_SEPARATOR: &str = "; ";

/// Why a record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ReasonCode {
    DateInvalid,
    DateOutOfRange,
    ClientIdMissing,
    ClientIdMalformed,
    ProductIdMissing,
    ProductIdMalformed,
    UnitsNonNumeric,
    UnitsZero,
    UnitsNonPositive,
    UnitsOutOfRange,
    PriceNonNumeric,
    PriceNegative,
    PriceOutOfRange,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 13] = [
        ReasonCode::DateInvalid,
        ReasonCode::DateOutOfRange,
        ReasonCode::ClientIdMissing,
        ReasonCode::ClientIdMalformed,
        ReasonCode::ProductIdMissing,
        ReasonCode::ProductIdMalformed,
        ReasonCode::UnitsNonNumeric,
        ReasonCode::UnitsZero,
        ReasonCode::UnitsNonPositive,
        ReasonCode::UnitsOutOfRange,
        ReasonCode::PriceNonNumeric,
        ReasonCode::PriceNegative,
        ReasonCode::PriceOutOfRange,
    ];

    /// Stable text persisted in the quarantine sink
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::DateInvalid => "date missing/invalid",
            ReasonCode::DateOutOfRange => "date out of range",
            ReasonCode::ClientIdMissing => "client id missing",
            ReasonCode::ClientIdMalformed => "client id malformed",
            ReasonCode::ProductIdMissing => "product id missing",
            ReasonCode::ProductIdMalformed => "product id malformed",
            ReasonCode::UnitsNonNumeric => "units non-numeric",
            ReasonCode::UnitsZero => "units zero",
            ReasonCode::UnitsNonPositive => "units non-positive",
            ReasonCode::UnitsOutOfRange => "units out of range",
            ReasonCode::PriceNonNumeric => "price non-numeric",
            ReasonCode::PriceNegative => "price negative",
            ReasonCode::PriceOutOfRange => "price out of range",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("Unknown reason code: {s}"))
    }
}

impl From<ReasonCode> for String {
    fn from(code: ReasonCode) -> Self {
        code.as_str().to_string()
    }
}

impl TryFrom<String> for ReasonCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Join reasons in rule order for persistence
pub fn join_reasons(reasons: &[ReasonCode]) -> String {
    reasons
        .iter()
        .map(ReasonCode::as_str)
        .collect::<Vec<_>>()
        .join(REASON_SEPARATOR)
}

/// Split a persisted reason list back into its parts.
///
/// Unknown fragments are returned as text so that sinks written by other tools
/// can still be summarized.
pub fn split_reasons(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Largest configurable `max_units`
pub const MAX_UNITS_LIMIT: u32 = 1_000_000;

/// Largest configurable `max_price`.
///
/// With [`MAX_UNITS_LIMIT`] every accepted line amount stays below 10^15, inside the
/// 18-digit decimal columns of the canonical table and snapshot.
pub const MAX_PRICE_LIMIT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Bounds applied by the date, units and price rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ValidationLimits {
    /// Earliest accepted sale date
    pub min_date: NaiveDate,
    /// Latest accepted sale date; "today" unless the run overrides it
    #[serde(skip, default = "today")]
    pub run_date: NaiveDate,
    /// Largest accepted quantity
    pub max_units: u32,
    /// Largest accepted unit price
    pub max_price: Decimal,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN),
            run_date: today(),
            max_units: 100,
            max_price: Decimal::from(1000),
        }
    }
}

impl ValidationLimits {
    /// Set the run date used as the upper date bound
    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    /// Check that the bounds describe a non-empty range
    pub fn validate(&self) -> Result<(), String> {
        if self.min_date > self.run_date {
            return Err(format!(
                "min_date {} is after run date {}",
                self.min_date, self.run_date
            ));
        }
        if self.max_units == 0 {
            return Err("max_units must be greater than 0".to_string());
        }
        if self.max_units > MAX_UNITS_LIMIT {
            return Err(format!(
                "max_units {} exceeds the supported maximum {MAX_UNITS_LIMIT}",
                self.max_units
            ));
        }
        if self.max_price.is_sign_negative() {
            return Err("max_price must not be negative".to_string());
        }
        if self.max_price > MAX_PRICE_LIMIT {
            return Err(format!(
                "max_price {} exceeds the supported maximum {MAX_PRICE_LIMIT}",
                self.max_price
            ));
        }
        Ok(())
    }
}

/// Outcome of validating one raw record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    /// Empty iff the record is valid
    pub reasons: Vec<ReasonCode>,
}

impl ValidationVerdict {
    fn from_reasons(reasons: Vec<ReasonCode>) -> Self {
        Self {
            is_valid: reasons.is_empty(),
            reasons,
        }
    }

    pub fn reason_text(&self) -> String {
        join_reasons(&self.reasons)
    }
}

/// Validate a raw record.
///
/// Rules run in a fixed order (date, client id, product id, units, price) and all of
/// them are applied, so the reason list is deterministic for identical input.
pub fn validate(record: &RawRecord, limits: &ValidationLimits) -> ValidationVerdict {
    let mut reasons = Vec::new();

    check_date(&record.date_text, limits, &mut reasons);
    check_id(
        &record.client_id,
        &CLIENT_ID,
        ReasonCode::ClientIdMissing,
        ReasonCode::ClientIdMalformed,
        &mut reasons,
    );
    check_id(
        &record.product_id,
        &PRODUCT_ID,
        ReasonCode::ProductIdMissing,
        ReasonCode::ProductIdMalformed,
        &mut reasons,
    );
    check_units(&record.units_text, limits, &mut reasons);
    check_price(&record.price_text, limits, &mut reasons);

    ValidationVerdict::from_reasons(reasons)
}

fn check_date(text: &str, limits: &ValidationLimits, reasons: &mut Vec<ReasonCode>) {
    match parse_date(text) {
        None => reasons.push(ReasonCode::DateInvalid),
        Some(date) if date < limits.min_date || date > limits.run_date => {
            reasons.push(ReasonCode::DateOutOfRange)
        }
        Some(_) => {}
    }
}

fn check_id(
    text: &str,
    pattern: &Regex,
    missing: ReasonCode,
    malformed: ReasonCode,
    reasons: &mut Vec<ReasonCode>,
) {
    let id = text.trim();
    if id.is_empty() {
        reasons.push(missing);
    } else if !pattern.is_match(id) {
        reasons.push(malformed);
    }
}

fn check_units(text: &str, limits: &ValidationLimits, reasons: &mut Vec<ReasonCode>) {
    let Some(units) = parse_units(text) else {
        reasons.push(ReasonCode::UnitsNonNumeric);
        return;
    };
    if units.is_zero() {
        reasons.push(ReasonCode::UnitsZero);
    } else if units.is_sign_negative() {
        reasons.push(ReasonCode::UnitsNonPositive);
    } else if units > Decimal::from(limits.max_units) {
        reasons.push(ReasonCode::UnitsOutOfRange);
    }
}

fn check_price(text: &str, limits: &ValidationLimits, reasons: &mut Vec<ReasonCode>) {
    let Some(price) = parse_decimal(text) else {
        reasons.push(ReasonCode::PriceNonNumeric);
        return;
    };
    if price.is_sign_negative() && !price.is_zero() {
        reasons.push(ReasonCode::PriceNegative);
    } else if price > limits.max_price {
        reasons.push(ReasonCode::PriceOutOfRange);
    }
}
