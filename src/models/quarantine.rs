//! Rejected rows kept for audit

use serde::{Deserialize, Serialize};

use super::raw::RawRecord;
use crate::validation::ReasonCode;

/// A raw row that failed validation, with every reason found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub raw: RawRecord,
    pub reasons: Vec<ReasonCode>,
}

impl QuarantineRecord {
    pub fn new(raw: RawRecord, reasons: Vec<ReasonCode>) -> Self {
        debug_assert!(!reasons.is_empty(), "quarantined row without reasons");
        Self { raw, reasons }
    }

    /// Reasons in rule order, joined with `"; "`
    pub fn reason_text(&self) -> String {
        crate::validation::join_reasons(&self.reasons)
    }
}
