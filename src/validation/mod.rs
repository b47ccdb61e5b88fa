//! Field validation for raw sales records
//!
//! [`validate`] is a pure function of one record and the configured
//! [`ValidationLimits`]; records can be validated in any order or in parallel.

pub mod parse;
pub mod rules;

pub use parse::{parse_date, parse_decimal, parse_units};
pub use rules::{
    MAX_PRICE_LIMIT, MAX_UNITS_LIMIT, REASON_SEPARATOR, ReasonCode, ValidationLimits,
    ValidationVerdict, join_reasons, split_reasons, validate,
};
