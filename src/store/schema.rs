//! Database schema definitions for the sales tables

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Schema for the raw log, canonical table and batch ledger
pub struct SalesSchema;

impl SalesSchema {
    /// Get the DDL for creating all tables (DuckDB syntax)
    pub fn create_tables_duckdb() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key VARCHAR PRIMARY KEY,
    value VARCHAR NOT NULL
);

-- Append-only log of every source row, valid or not
CREATE TABLE IF NOT EXISTS raw_sales (
    batch_id VARCHAR NOT NULL,
    row_number BIGINT NOT NULL,
    origin_file VARCHAR NOT NULL,
    ingested_at VARCHAR NOT NULL,
    fecha VARCHAR,
    id_cliente VARCHAR,
    id_producto VARCHAR,
    nombre_producto VARCHAR,
    unidades VARCHAR,
    precio_unitario VARCHAR,
    row_hash VARCHAR NOT NULL
);

-- Canonical sales, one row per business key
CREATE TABLE IF NOT EXISTS clean_sales (
    sale_date DATE NOT NULL,
    client_id VARCHAR NOT NULL,
    product_id VARCHAR NOT NULL,
    product_name VARCHAR,
    units INTEGER NOT NULL CHECK (units > 0),
    unit_price DECIMAL(18, 4) NOT NULL CHECK (unit_price >= 0),
    amount DECIMAL(18, 2) NOT NULL,
    ingested_at VARCHAR NOT NULL,
    PRIMARY KEY (sale_date, client_id, product_id)
);

-- Batch ledger
CREATE TABLE IF NOT EXISTS ingest_batches (
    id VARCHAR PRIMARY KEY,
    source_path VARCHAR NOT NULL,
    source_digest VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    files_total BIGINT DEFAULT 0,
    rows_raw BIGINT DEFAULT 0,
    rows_valid BIGINT DEFAULT 0,
    rows_quarantined BIGINT DEFAULT 0,
    duplicates_dropped BIGINT DEFAULT 0,
    rows_inserted BIGINT DEFAULT 0,
    rows_updated BIGINT DEFAULT 0,
    started_at VARCHAR NOT NULL,
    completed_at VARCHAR,
    error_message VARCHAR
);

CREATE INDEX IF NOT EXISTS idx_raw_batch ON raw_sales(batch_id);
"#
    }

    /// Get the SELECT statement for schema version
    pub fn select_schema_version() -> &'static str {
        "SELECT value FROM schema_info WHERE key = 'version'"
    }

    /// Keyed merge of one canonical row.
    ///
    /// Parameters: date, client id, product id, product name, units, unit price,
    /// amount, ingested_at. The update only fires for a newer-or-equal record whose
    /// values differ from the stored ones, so re-applying a batch changes nothing.
    pub fn merge_clean_sale() -> &'static str {
        "INSERT INTO clean_sales
             (sale_date, client_id, product_id, product_name, units, unit_price, amount, ingested_at)
         VALUES (CAST(?1 AS DATE), ?2, ?3, ?4, ?5,
                 CAST(?6 AS DECIMAL(18, 4)), CAST(?7 AS DECIMAL(18, 2)), ?8)
         ON CONFLICT (sale_date, client_id, product_id) DO UPDATE SET
             product_name = EXCLUDED.product_name,
             units = EXCLUDED.units,
             unit_price = EXCLUDED.unit_price,
             amount = EXCLUDED.amount,
             ingested_at = EXCLUDED.ingested_at
         WHERE EXCLUDED.ingested_at >= clean_sales.ingested_at
           AND (clean_sales.product_name IS DISTINCT FROM EXCLUDED.product_name
                OR clean_sales.units <> EXCLUDED.units
                OR clean_sales.unit_price <> EXCLUDED.unit_price
                OR clean_sales.amount <> EXCLUDED.amount)"
    }

    /// Append one raw row
    pub fn insert_raw_sale() -> &'static str {
        "INSERT INTO raw_sales
             (batch_id, row_number, origin_file, ingested_at, fecha, id_cliente, id_producto,
              nombre_producto, unidades, precio_unitario, row_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
    }

    /// Insert or replace a ledger entry
    pub fn upsert_batch() -> &'static str {
        "INSERT INTO ingest_batches
             (id, source_path, source_digest, status, files_total, rows_raw, rows_valid,
              rows_quarantined, duplicates_dropped, rows_inserted, rows_updated,
              started_at, completed_at, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT (id) DO UPDATE SET
             source_path = EXCLUDED.source_path,
             source_digest = EXCLUDED.source_digest,
             status = EXCLUDED.status,
             files_total = EXCLUDED.files_total,
             rows_raw = EXCLUDED.rows_raw,
             rows_valid = EXCLUDED.rows_valid,
             rows_quarantined = EXCLUDED.rows_quarantined,
             duplicates_dropped = EXCLUDED.duplicates_dropped,
             rows_inserted = EXCLUDED.rows_inserted,
             rows_updated = EXCLUDED.rows_updated,
             started_at = EXCLUDED.started_at,
             completed_at = EXCLUDED.completed_at,
             error_message = EXCLUDED.error_message"
    }

    /// Canonical columns in read-back form
    pub fn select_clean_columns() -> &'static str {
        "SELECT CAST(sale_date AS VARCHAR), client_id, product_id, product_name, units,
                CAST(unit_price AS VARCHAR), CAST(amount AS VARCHAR), ingested_at
         FROM clean_sales"
    }

    /// Ledger columns in read-back form
    pub fn select_batch_columns() -> &'static str {
        "SELECT id, source_path, source_digest, status, files_total, rows_raw, rows_valid,
                rows_quarantined, duplicates_dropped, rows_inserted, rows_updated,
                started_at, completed_at, error_message
         FROM ingest_batches"
    }
}
