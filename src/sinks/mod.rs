//! File outputs of a pipeline run
//!
//! - Quarantine CSV: every rejected row with its reasons, replaced each run
//! - Canonical snapshot: Parquet copy of the keyed table, read back after commit
//!
//! Both files are written to a temporary sibling and renamed into place.

pub(crate) mod atomic;
pub mod error;
pub mod quarantine;
pub mod snapshot;

pub use error::SinkError;
pub use quarantine::{QUARANTINE_HEADER, QuarantineRow, read_quarantine, write_quarantine};
pub use snapshot::{read_snapshot, snapshot_schema, write_snapshot};
