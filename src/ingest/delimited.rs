//! CSV drop-file reader

use std::path::Path;

use chrono::{DateTime, Utc};
use csv::ReaderBuilder;

use super::error::IngestError;
use super::row_timestamp;
use crate::models::{RawRecord, SourceField};

/// Column index for each source field found in the header
struct HeaderMap {
    fields: Vec<(SourceField, usize)>,
    ingested_at: Option<usize>,
    missing: Vec<SourceField>,
}

impl HeaderMap {
    fn from_headers<'a>(headers: impl Iterator<Item = &'a [u8]>) -> Self {
        let mut fields = Vec::new();
        let mut ingested_at = None;
        for (index, name) in headers.enumerate() {
            let name = String::from_utf8_lossy(name);
            if let Some(field) = SourceField::from_header(&name) {
                if !fields.iter().any(|(f, _)| *f == field) {
                    fields.push((field, index));
                }
            } else if super::is_timestamp_column(&name) && ingested_at.is_none() {
                ingested_at = Some(index);
            }
        }
        let missing = SourceField::ALL
            .into_iter()
            .filter(|field| !fields.iter().any(|(f, _)| f == field))
            .collect();
        Self {
            fields,
            ingested_at,
            missing,
        }
    }
}

/// Read every row of a CSV file as a [`RawRecord`].
///
/// The header row selects columns by name; extra columns are ignored and missing
/// ones read as empty text. Short rows are padded the same way.
pub fn read_csv_file(
    path: &Path,
    origin_file: &str,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<RawRecord>, IngestError> {
    let csv_err = |e: csv::Error| IngestError::Csv {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            let not_found = matches!(
                e.kind(),
                csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound
            );
            if not_found {
                IngestError::FileNotFound(path.to_path_buf())
            } else {
                csv_err(e)
            }
        })?;

    let header = HeaderMap::from_headers(reader.byte_headers().map_err(csv_err)?.iter());
    if header.fields.is_empty() {
        return Err(IngestError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "header row names none of the sales columns".to_string(),
        });
    }
    for field in header.missing.iter().filter(|f| !f.is_optional()) {
        tracing::warn!(
            file = origin_file,
            column = field.header(),
            "Source column missing; values read as empty"
        );
    }

    let mut records = Vec::new();
    for row in reader.byte_records() {
        let row = row.map_err(csv_err)?;
        let row_ts = header
            .ingested_at
            .and_then(|index| row.get(index))
            .and_then(|raw| row_timestamp(&String::from_utf8_lossy(raw)))
            .unwrap_or(ingested_at);

        let mut record = RawRecord::new(origin_file, row_ts);
        for (field, index) in &header.fields {
            if let Some(value) = row.get(*index) {
                record.set(*field, String::from_utf8_lossy(value).into_owned());
            }
        }
        records.push(record);
    }

    tracing::debug!(file = origin_file, rows = records.len(), "Read CSV file");
    Ok(records)
}
