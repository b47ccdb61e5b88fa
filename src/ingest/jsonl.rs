//! NDJSON / JSONL drop-file reader

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::IngestError;
use super::row_timestamp;
use crate::models::{RawRecord, SourceField};

/// Render a JSON value as source text
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Read every non-empty line of a JSONL file as a [`RawRecord`].
///
/// Each line must be a JSON object. Keys are matched against the source header
/// names; unknown keys are ignored and absent ones read as empty text.
pub fn read_jsonl_file(
    path: &Path,
    origin_file: &str,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<RawRecord>, IngestError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IngestError::FileNotFound(path.to_path_buf()),
        _ => IngestError::Io(e),
    })?;
    let content = String::from_utf8_lossy(&bytes);

    let mut records = Vec::new();
    for (index, line) in content.trim_start_matches('\u{feff}').lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parse_err = |error: String| IngestError::JsonParse {
            path: path.to_path_buf(),
            line: index + 1,
            error,
        };
        let value: Value = serde_json::from_str(trimmed).map_err(|e| parse_err(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(parse_err("expected a JSON object".to_string()));
        };

        let mut row_ts = ingested_at;
        let mut record = RawRecord::new(origin_file, ingested_at);
        for (key, value) in &object {
            if let Some(field) = SourceField::from_header(key) {
                record.set(field, value_text(value));
            } else if super::is_timestamp_column(key) {
                if let Some(ts) = value.as_str().and_then(row_timestamp) {
                    row_ts = ts;
                }
            }
        }
        record.ingested_at = row_ts;
        records.push(record);
    }

    tracing::debug!(file = origin_file, rows = records.len(), "Read JSONL file");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_jsonl_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ventas.jsonl",
            concat!(
                r#"{"fecha":"2025-01-03","id_cliente":"C001","id_producto":"P010","unidades":2,"precio_unitario":12.5}"#,
                "\n\n",
                r#"{"fecha":"2025-01-04","id_cliente":null,"id_producto":"P010","unidades":"tres","precio_unitario":"8,00","extra":[1,2]}"#,
                "\n",
            ),
        );
        let records = read_jsonl_file(&path, "ventas.jsonl", Utc::now()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].units_text, "2");
        assert_eq!(records[0].price_text, "12.5");
        assert_eq!(records[0].product_name, "");
        assert_eq!(records[1].client_id, "");
        assert_eq!(records[1].units_text, "tres");
        assert_eq!(records[1].price_text, "8,00");
    }

    #[test]
    fn test_nested_values_become_json_text() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ventas.ndjson",
            r#"{"fecha":"2025-01-03","unidades":{"n":2},"precio_unitario":true}"#,
        );
        let records = read_jsonl_file(&path, "ventas.ndjson", Utc::now()).unwrap();
        assert_eq!(records[0].units_text, r#"{"n":2}"#);
        assert_eq!(records[0].price_text, "true");
    }

    #[test]
    fn test_row_timestamp_key() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ventas.jsonl",
            r#"{"fecha":"2025-01-03","ingested_at":"2025-03-01T08:30:00+01:00"}"#,
        );
        let records = read_jsonl_file(&path, "ventas.jsonl", Utc::now()).unwrap();
        assert_eq!(records[0].ingested_at.to_rfc3339(), "2025-03-01T07:30:00+00:00");
    }

    #[test]
    fn test_leading_byte_order_mark_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ventas.jsonl",
            "\u{feff}{\"fecha\":\"2025-01-03\",\"id_cliente\":\"C001\"}\n",
        );
        let records = read_jsonl_file(&path, "ventas.jsonl", Utc::now()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date_text, "2025-01-03");
        assert_eq!(records[0].client_id, "C001");
    }

    #[test]
    fn test_invalid_line_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ventas.jsonl", "{\"fecha\":\"2025-01-03\"}\n{broken\n");
        let err = read_jsonl_file(&path, "ventas.jsonl", Utc::now()).unwrap_err();
        match err {
            IngestError::JsonParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_object_line_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ventas.jsonl", "[1,2,3]\n");
        let err = read_jsonl_file(&path, "ventas.jsonl", Utc::now()).unwrap_err();
        assert!(matches!(err, IngestError::JsonParse { line: 1, .. }));
    }
}
