//! Total parsers for source text fields
//!
//! Each parser returns `None` instead of failing, so rule evaluation never aborts
//! on malformed input.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, or an ISO-8601 date-time (with or without
/// offset) whose date part is used.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|datetime| datetime.date())
}

/// Parse a decimal number accepting `.` or `,` as the fractional separator
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let normalized = text.replace(',', ".");
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Parse a quantity.
///
/// Returns the numeric value when the text is a number with no fractional part
/// (`"3"`, `"3.0"`, `"-1"`). Fractional quantities are not numbers of units.
pub fn parse_units(text: &str) -> Option<Decimal> {
    let value = parse_decimal(text)?;
    if value.fract().is_zero() {
        Some(value.normalize())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-01-03"), Some(date("2025-01-03")));
        assert_eq!(parse_date(" 2025/01/03 "), Some(date("2025-01-03")));
        assert_eq!(parse_date("2025-01-03T10:15:00Z"), Some(date("2025-01-03")));
        assert_eq!(parse_date("2025-01-03T23:15:00+02:00"), Some(date("2025-01-03")));
        assert_eq!(parse_date("2025-01-03 10:15:00"), Some(date("2025-01-03")));
    }

    #[test]
    fn test_parse_date_rejects_impossible_dates() {
        assert_eq!(parse_date("2025-13-01"), None);
        assert_eq!(parse_date("2025/13/45"), None);
        assert_eq!(parse_date("2025-02-30"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("ayer"), None);
    }

    #[test]
    fn test_parse_decimal_separators() {
        assert_eq!(parse_decimal("12.50"), Decimal::from_str("12.50").ok());
        assert_eq!(parse_decimal("12,50"), Decimal::from_str("12.50").ok());
        assert_eq!(parse_decimal("-8"), Decimal::from_str("-8").ok());
        assert_eq!(parse_decimal("1e2"), Decimal::from_str("100").ok());
        assert_eq!(parse_decimal("doce"), None);
        assert_eq!(parse_decimal("1.234,5"), None);
        assert_eq!(parse_decimal("   "), None);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("3"), Some(Decimal::from(3)));
        assert_eq!(parse_units("3.0"), Some(Decimal::from(3)));
        assert_eq!(parse_units("-1"), Some(Decimal::from(-1)));
        assert_eq!(parse_units("2.5"), None);
        assert_eq!(parse_units("diez"), None);
    }
}
