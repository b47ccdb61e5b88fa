//! DuckDB canonical store

use std::str::FromStr;
use std::sync::Mutex;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::schema::{SCHEMA_VERSION, SalesSchema};
use super::{
    BatchCounts, BatchRecord, BatchStatus, CanonicalReader, CanonicalStore, MergeAction,
    MergeStats, SalesFilter, StoreError, merge_action, parse_timestamp, timestamp_text,
};
use crate::models::{BusinessKey, CleanRecord, RawRecord};

/// Canonical row as read from the database, before typing
struct StoredSale {
    sale_date: String,
    client_id: String,
    product_id: String,
    product_name: Option<String>,
    units: i64,
    unit_price: String,
    amount: String,
    ingested_at: String,
}

impl StoredSale {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            sale_date: row.get(0)?,
            client_id: row.get(1)?,
            product_id: row.get(2)?,
            product_name: row.get(3)?,
            units: row.get(4)?,
            unit_price: row.get(5)?,
            amount: row.get(6)?,
            ingested_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<CleanRecord, StoreError> {
        let corrupt = |column: &'static str, value: &str| StoreError::Corrupt {
            column,
            value: value.to_string(),
        };
        let date = NaiveDate::parse_from_str(&self.sale_date, "%Y-%m-%d")
            .map_err(|_| corrupt("sale_date", &self.sale_date))?;
        let units =
            u32::try_from(self.units).map_err(|_| corrupt("units", &self.units.to_string()))?;
        let unit_price = Decimal::from_str(&self.unit_price)
            .map_err(|_| corrupt("unit_price", &self.unit_price))?;
        let amount =
            Decimal::from_str(&self.amount).map_err(|_| corrupt("amount", &self.amount))?;

        Ok(CleanRecord {
            date,
            client_id: self.client_id,
            product_id: self.product_id,
            product_name: self.product_name,
            units,
            unit_price,
            amount,
            ingested_at: parse_timestamp("ingested_at", &self.ingested_at)?,
        })
    }
}

/// Ledger row as read from the database, before typing
struct StoredBatch {
    id: String,
    source_path: String,
    source_digest: String,
    status: String,
    counts: [i64; 7],
    started_at: String,
    completed_at: Option<String>,
    error_message: Option<String>,
}

impl StoredBatch {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_path: row.get(1)?,
            source_digest: row.get(2)?,
            status: row.get(3)?,
            counts: [
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
            ],
            started_at: row.get(11)?,
            completed_at: row.get(12)?,
            error_message: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<BatchRecord, StoreError> {
        let status = self
            .status
            .parse::<BatchStatus>()
            .map_err(|_| StoreError::Corrupt {
                column: "status",
                value: self.status.clone(),
            })?;
        let [files_total, raw, valid, quarantined, duplicates_dropped, inserted, updated] =
            self.counts.map(|n| n.max(0) as u64);

        Ok(BatchRecord {
            id: self.id,
            source_path: self.source_path,
            source_digest: self.source_digest,
            status,
            files_total,
            counts: BatchCounts {
                raw,
                valid,
                quarantined,
                duplicates_dropped,
                inserted,
                updated,
            },
            started_at: parse_timestamp("started_at", &self.started_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(|ts| parse_timestamp("completed_at", ts))
                .transpose()?,
            error_message: self.error_message,
        })
    }
}

/// Canonical store backed by an embedded DuckDB database.
///
/// The connection sits behind a mutex, so batches from concurrent callers are
/// applied one at a time.
pub struct DuckDbStore {
    conn: Mutex<duckdb::Connection>,
}

impl DuckDbStore {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = duckdb::Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> Result<Self, StoreError> {
        let conn = duckdb::Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the schema version
    pub fn schema_version(&self) -> Result<i32, StoreError> {
        let conn = self.conn.lock()?;
        Self::read_schema_version(&conn)
    }

    fn read_schema_version(conn: &duckdb::Connection) -> Result<i32, StoreError> {
        let version: String =
            conn.query_row(SalesSchema::select_schema_version(), [], |row| row.get(0))?;
        version
            .parse()
            .map_err(|_| StoreError::Database("Invalid schema version".to_string()))
    }

    fn select_sales(
        conn: &duckdb::Connection,
        filter: &SalesFilter,
    ) -> Result<Vec<CleanRecord>, StoreError> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();
        if let Some(from) = filter.from {
            conditions.push("sale_date >= CAST(? AS DATE)");
            values.push(from.to_string());
        }
        if let Some(to) = filter.to {
            conditions.push("sale_date <= CAST(? AS DATE)");
            values.push(to.to_string());
        }
        if let Some(product_id) = &filter.product_id {
            conditions.push("product_id = ?");
            values.push(product_id.clone());
        }

        let mut sql = SalesSchema::select_clean_columns().to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY sale_date, client_id, product_id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(duckdb::params_from_iter(values.iter()), StoredSale::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn select_sale(
        conn: &duckdb::Connection,
        key: &BusinessKey,
    ) -> Result<Option<CleanRecord>, StoreError> {
        let sql = format!(
            "{} WHERE sale_date = CAST(?1 AS DATE) AND client_id = ?2 AND product_id = ?3",
            SalesSchema::select_clean_columns()
        );
        let result = conn.query_row(
            &sql,
            duckdb::params![key.date.to_string(), key.client_id, key.product_id],
            StoredSale::from_row,
        );

        match result {
            Ok(stored) => Ok(Some(stored.into_record()?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_batch(conn: &duckdb::Connection, batch: &BatchRecord) -> Result<(), StoreError> {
        conn.execute(
            SalesSchema::upsert_batch(),
            duckdb::params![
                batch.id,
                batch.source_path,
                batch.source_digest,
                batch.status.to_string(),
                batch.files_total as i64,
                batch.counts.raw as i64,
                batch.counts.valid as i64,
                batch.counts.quarantined as i64,
                batch.counts.duplicates_dropped as i64,
                batch.counts.inserted as i64,
                batch.counts.updated as i64,
                timestamp_text(&batch.started_at),
                batch.completed_at.as_ref().map(timestamp_text),
                batch.error_message.as_deref(),
            ],
        )?;
        Ok(())
    }
}

impl CanonicalReader for DuckDbStore {
    fn get(&self, key: &BusinessKey) -> Result<Option<CleanRecord>, StoreError> {
        let conn = self.conn.lock()?;
        Self::select_sale(&conn, key)
    }

    fn query(&self, filter: &SalesFilter) -> Result<Vec<CleanRecord>, StoreError> {
        let conn = self.conn.lock()?;
        Self::select_sales(&conn, filter)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM clean_sales", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

impl CanonicalStore for DuckDbStore {
    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        conn.execute_batch(SalesSchema::create_tables_duckdb())?;

        let existing: Result<String, _> =
            conn.query_row(SalesSchema::select_schema_version(), [], |row| row.get(0));
        match existing {
            Ok(_) => {
                let found = Self::read_schema_version(&conn)?;
                if found != SCHEMA_VERSION {
                    return Err(StoreError::SchemaVersionMismatch {
                        expected: SCHEMA_VERSION,
                        found,
                    });
                }
            }
            Err(duckdb::Error::QueryReturnedNoRows) => {
                conn.execute(
                    "INSERT INTO schema_info (key, value) VALUES ('version', ?1)",
                    [SCHEMA_VERSION.to_string()],
                )?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    fn commit_batch(
        &self,
        batch: &mut BatchRecord,
        raw: &[RawRecord],
        clean: &[CleanRecord],
    ) -> Result<MergeStats, StoreError> {
        let mut conn = self.conn.lock()?;
        // Dropping the transaction without commit rolls everything back
        let tx = conn.transaction()?;

        {
            let mut insert_raw = tx.prepare(SalesSchema::insert_raw_sale())?;
            for (row_number, record) in raw.iter().enumerate() {
                insert_raw.execute(duckdb::params![
                    batch.id,
                    row_number as i64,
                    record.origin_file,
                    timestamp_text(&record.ingested_at),
                    record.date_text,
                    record.client_id,
                    record.product_id,
                    record.product_name,
                    record.units_text,
                    record.price_text,
                    record.row_hash(),
                ])?;
            }
        }

        let mut stats = MergeStats::default();
        {
            let mut merge = tx.prepare(SalesSchema::merge_clean_sale())?;
            for record in clean {
                let existing = Self::select_sale(&tx, &record.key())?;
                let action = merge_action(existing.as_ref(), record);
                if action != MergeAction::Unchanged {
                    merge.execute(duckdb::params![
                        record.date.to_string(),
                        record.client_id,
                        record.product_id,
                        record.product_name.as_deref(),
                        i64::from(record.units),
                        record.unit_price.to_string(),
                        record.amount.to_string(),
                        timestamp_text(&record.ingested_at),
                    ])?;
                }
                stats.record(action);
            }
        }

        let mut completed = batch.clone();
        completed.counts.inserted = stats.inserted;
        completed.counts.updated = stats.updated;
        completed.complete();
        Self::write_batch(&tx, &completed)?;

        tx.commit()?;
        *batch = completed;

        tracing::debug!(
            batch_id = %batch.id,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "Committed batch"
        );
        Ok(stats)
    }

    fn record_failed_batch(&self, batch: &BatchRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        Self::write_batch(&conn, batch)
    }

    fn list_batches(&self, limit: usize) -> Result<Vec<BatchRecord>, StoreError> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "{} ORDER BY started_at DESC LIMIT ?1",
            SalesSchema::select_batch_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([limit as i64], StoredBatch::from_row)?;

        let mut batches = Vec::new();
        for row in rows {
            batches.push(row?.into_record()?);
        }
        Ok(batches)
    }

    fn find_completed_by_digest(&self, digest: &str) -> Result<Option<BatchRecord>, StoreError> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "{} WHERE source_digest = ?1 AND status = 'completed' ORDER BY started_at DESC LIMIT 1",
            SalesSchema::select_batch_columns()
        );
        let result = conn.query_row(&sql, [digest], StoredBatch::from_row);

        match result {
            Ok(stored) => Ok(Some(stored.into_record()?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn raw_log_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM raw_sales", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}
