//! Canonical (validated, typed) sales records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for unit prices
pub const PRICE_SCALE: u32 = 4;

/// Decimal places kept for line amounts
pub const AMOUNT_SCALE: u32 = 2;

/// Identity of a sales event: one canonical row per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusinessKey {
    pub date: NaiveDate,
    pub client_id: String,
    pub product_id: String,
}

impl BusinessKey {
    pub fn new(date: NaiveDate, client_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            date,
            client_id: client_id.into(),
            product_id: product_id.into(),
        }
    }
}

impl std::fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.date, self.client_id, self.product_id)
    }
}

/// A validated sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub date: NaiveDate,
    pub client_id: String,
    pub product_id: String,
    pub product_name: Option<String>,
    pub units: u32,
    pub unit_price: Decimal,
    /// `units * unit_price`, rounded to [`AMOUNT_SCALE`] places
    pub amount: Decimal,
    pub ingested_at: DateTime<Utc>,
}

impl CleanRecord {
    /// Build a record, normalizing the price scale and deriving `amount`.
    ///
    /// Returns `None` when `units * unit_price` does not fit a [`Decimal`].
    pub fn try_new(
        date: NaiveDate,
        client_id: impl Into<String>,
        product_id: impl Into<String>,
        product_name: Option<String>,
        units: u32,
        unit_price: Decimal,
        ingested_at: DateTime<Utc>,
    ) -> Option<Self> {
        let unit_price = round_price(unit_price);
        let amount = line_amount(units, unit_price)?;
        Some(Self {
            date,
            client_id: client_id.into(),
            product_id: product_id.into(),
            product_name,
            units,
            unit_price,
            amount,
            ingested_at,
        })
    }

    pub fn key(&self) -> BusinessKey {
        BusinessKey::new(self.date, self.client_id.clone(), self.product_id.clone())
    }

    /// True when both records carry the same non-key values
    pub fn same_values(&self, other: &CleanRecord) -> bool {
        self.product_name == other.product_name
            && self.units == other.units
            && self.unit_price == other.unit_price
            && self.amount == other.amount
    }
}

/// Round a unit price to [`PRICE_SCALE`] places
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `units * unit_price` rounded half away from zero to [`AMOUNT_SCALE`] places,
/// or `None` on overflow
pub fn line_amount(units: u32, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(units).checked_mul(unit_price).map(|amount| {
        amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
    })
}
