//! Parquet snapshot of the canonical table

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Date32Array, Decimal128Array, StringArray, TimestampMicrosecondArray,
    UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rust_decimal::Decimal;

use super::SinkError;
use super::atomic::AtomicFile;
use crate::models::CleanRecord;
use crate::models::clean::{AMOUNT_SCALE, PRICE_SCALE};

const DECIMAL_PRECISION: u8 = 18;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Arrow schema of the snapshot file
pub fn snapshot_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("sale_date", DataType::Date32, false),
        Field::new("client_id", DataType::Utf8, false),
        Field::new("product_id", DataType::Utf8, false),
        Field::new("product_name", DataType::Utf8, true),
        Field::new("units", DataType::UInt32, false),
        Field::new(
            "unit_price",
            DataType::Decimal128(DECIMAL_PRECISION, PRICE_SCALE as i8),
            false,
        ),
        Field::new(
            "amount",
            DataType::Decimal128(DECIMAL_PRECISION, AMOUNT_SCALE as i8),
            false,
        ),
        Field::new(
            "ingested_at",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
    ]))
}

fn scaled(value: Decimal, scale: u32) -> i128 {
    let mut value = value;
    value.rescale(scale);
    value.mantissa()
}

fn to_record_batch(records: &[CleanRecord]) -> Result<RecordBatch, SinkError> {
    let epoch = epoch();
    let dates = Date32Array::from(
        records
            .iter()
            .map(|r| (r.date - epoch).num_days() as i32)
            .collect::<Vec<_>>(),
    );
    let clients = StringArray::from_iter_values(records.iter().map(|r| r.client_id.as_str()));
    let products = StringArray::from_iter_values(records.iter().map(|r| r.product_id.as_str()));
    let names = StringArray::from(
        records
            .iter()
            .map(|r| r.product_name.as_deref())
            .collect::<Vec<_>>(),
    );
    let units = UInt32Array::from(records.iter().map(|r| r.units).collect::<Vec<_>>());
    let prices = Decimal128Array::from(
        records
            .iter()
            .map(|r| scaled(r.unit_price, PRICE_SCALE))
            .collect::<Vec<_>>(),
    )
    .with_precision_and_scale(DECIMAL_PRECISION, PRICE_SCALE as i8)?;
    let amounts = Decimal128Array::from(
        records
            .iter()
            .map(|r| scaled(r.amount, AMOUNT_SCALE))
            .collect::<Vec<_>>(),
    )
    .with_precision_and_scale(DECIMAL_PRECISION, AMOUNT_SCALE as i8)?;
    let ingested = TimestampMicrosecondArray::from(
        records
            .iter()
            .map(|r| r.ingested_at.timestamp_micros())
            .collect::<Vec<_>>(),
    )
    .with_timezone("UTC");

    let columns: Vec<ArrayRef> = vec![
        Arc::new(dates),
        Arc::new(clients),
        Arc::new(products),
        Arc::new(names),
        Arc::new(units),
        Arc::new(prices),
        Arc::new(amounts),
        Arc::new(ingested),
    ];
    Ok(RecordBatch::try_new(snapshot_schema(), columns)?)
}

/// Replace the snapshot file with `records`
pub fn write_snapshot(path: &Path, records: &[CleanRecord]) -> Result<(), SinkError> {
    let batch = to_record_batch(records)?;

    let file = AtomicFile::create(path)?;
    let mut writer = ArrowWriter::try_new(file.writer()?, snapshot_schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    file.commit()?;

    tracing::info!(path = %path.display(), rows = records.len(), "Wrote canonical snapshot");
    Ok(())
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a T, SinkError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| SinkError::InvalidSnapshot {
            path: path.to_path_buf(),
            reason: format!("missing or mistyped column '{name}'"),
        })
}

/// Read every record back from a snapshot file
pub fn read_snapshot(path: &Path) -> Result<Vec<CleanRecord>, SinkError> {
    let file = File::open(path).map_err(|e| SinkError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let epoch = epoch();
    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        let dates = column::<Date32Array>(&batch, "sale_date", path)?;
        let clients = column::<StringArray>(&batch, "client_id", path)?;
        let products = column::<StringArray>(&batch, "product_id", path)?;
        let names = column::<StringArray>(&batch, "product_name", path)?;
        let units = column::<UInt32Array>(&batch, "units", path)?;
        let prices = column::<Decimal128Array>(&batch, "unit_price", path)?;
        let amounts = column::<Decimal128Array>(&batch, "amount", path)?;
        let ingested = column::<TimestampMicrosecondArray>(&batch, "ingested_at", path)?;

        for i in 0..batch.num_rows() {
            let ingested_at = DateTime::<Utc>::from_timestamp_micros(ingested.value(i))
                .ok_or_else(|| SinkError::InvalidSnapshot {
                    path: path.to_path_buf(),
                    reason: format!("timestamp out of range at row {i}"),
                })?;
            records.push(CleanRecord {
                date: epoch + Duration::days(i64::from(dates.value(i))),
                client_id: clients.value(i).to_string(),
                product_id: products.value(i).to_string(),
                product_name: (!names.is_null(i)).then(|| names.value(i).to_string()),
                units: units.value(i),
                unit_price: Decimal::from_i128_with_scale(prices.value(i), PRICE_SCALE),
                amount: Decimal::from_i128_with_scale(amounts.value(i), AMOUNT_SCALE),
                ingested_at,
            });
        }
    }

    Ok(records)
}
