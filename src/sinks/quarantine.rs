//! Quarantine CSV sink

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use super::SinkError;
use super::atomic::AtomicFile;
use crate::models::QuarantineRecord;
use crate::store::timestamp_text;
use crate::validation::split_reasons;

/// Column order of the quarantine file
pub const QUARANTINE_HEADER: [&str; 8] = [
    "fecha",
    "id_cliente",
    "id_producto",
    "unidades",
    "precio_unitario",
    "origin_file",
    "ingested_at",
    "reasons",
];

/// One line of the quarantine file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRow {
    pub fecha: String,
    pub id_cliente: String,
    pub id_producto: String,
    pub unidades: String,
    pub precio_unitario: String,
    pub origin_file: String,
    pub ingested_at: String,
    pub reasons: String,
}

impl QuarantineRow {
    pub fn reason_list(&self) -> Vec<String> {
        split_reasons(&self.reasons)
    }
}

impl From<&QuarantineRecord> for QuarantineRow {
    fn from(record: &QuarantineRecord) -> Self {
        let raw = &record.raw;
        Self {
            fecha: raw.date_text.clone(),
            id_cliente: raw.client_id.clone(),
            id_producto: raw.product_id.clone(),
            unidades: raw.units_text.clone(),
            precio_unitario: raw.price_text.clone(),
            origin_file: raw.origin_file.clone(),
            ingested_at: timestamp_text(&raw.ingested_at),
            reasons: record.reason_text(),
        }
    }
}

/// Replace the quarantine file with `records`.
///
/// The header is always written, so an empty run leaves a header-only file.
pub fn write_quarantine(path: &Path, records: &[QuarantineRecord]) -> Result<(), SinkError> {
    let file = AtomicFile::create(path)?;
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(file.writer()?);
        writer.write_record(QUARANTINE_HEADER)?;
        for record in records {
            writer.serialize(QuarantineRow::from(record))?;
        }
        writer.flush().map_err(|e| SinkError::io(file.tmp_path(), e))?;
    }
    file.commit()?;

    tracing::info!(path = %path.display(), rows = records.len(), "Wrote quarantine file");
    Ok(())
}

/// Read a quarantine file back; a missing file reads as empty
pub fn read_quarantine(path: &Path) -> Result<Vec<QuarantineRow>, SinkError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read(path).map_err(|e| SinkError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_slice());

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
