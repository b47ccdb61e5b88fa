//! Record types shared by every pipeline stage
//!
//! A row enters as a [`RawRecord`], leaves validation either as a [`CleanRecord`]
//! (after coercion) or as a [`QuarantineRecord`], and clean rows are identified by
//! their [`BusinessKey`].

pub mod clean;
pub mod quarantine;
pub mod raw;

pub use clean::{BusinessKey, CleanRecord, line_amount, round_price};
pub use quarantine::QuarantineRecord;
pub use raw::{RawRecord, SourceField};
