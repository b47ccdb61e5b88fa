//! Integration tests for the full sales pipeline
//!
//! Tests the complete workflow: drop files → validation → dedup → store → outputs

use std::fs;
use std::path::PathBuf;
#[cfg(feature = "duckdb-backend")]
use std::path::Path;

use chrono::{NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use sales_pipeline::models::BusinessKey;
use sales_pipeline::pipeline::{PipelineConfig, PipelineError, PipelineExecutor};
use sales_pipeline::sinks::{read_quarantine, read_snapshot};
use sales_pipeline::store::{
    BatchRecord, BatchStatus, CanonicalReader, CanonicalStore, MemoryStore, MergeStats,
    SalesFilter, StoreError,
};
use sales_pipeline::{CleanRecord, RawRecord};

const HEADER5: &str = "fecha,id_cliente,id_producto,unidades,precio_unitario";
const HEADER6: &str = "fecha,id_cliente,id_producto,nombre_producto,unidades,precio_unitario";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(dir.path().join("drops")).expect("Failed to create drops dir");
        Self { dir }
    }

    fn drops(&self) -> PathBuf {
        self.dir.path().join("drops")
    }

    fn write_drop(&self, name: &str, content: &str) {
        fs::write(self.drops().join(name), content).expect("Failed to write drop file");
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    fn quarantine_path(&self) -> PathBuf {
        self.output().join("quality").join("ventas_invalidas.csv")
    }

    fn snapshot_path(&self) -> PathBuf {
        self.output().join("parquet").join("clean_ventas.parquet")
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_source(self.drops())
            .with_memory_database()
            .with_output_dir(self.output())
            .with_run_date(date(2025, 1, 31))
            .with_workers(2)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn key(d: u32, client: &str, product: &str) -> BusinessKey {
    BusinessKey::new(date(2025, 1, d), client, product)
}

fn run(workspace: &Workspace, store: &dyn CanonicalStore) -> sales_pipeline::RunReport {
    PipelineExecutor::new(workspace.config(), store)
        .expect("Failed to create executor")
        .run()
        .expect("Pipeline run failed")
}

const MIXED_DROP: &str = "\
fecha,id_cliente,id_producto,nombre_producto,unidades,precio_unitario
2025-01-03,C001,P010,Cafe,2,12.50
2025-01-04,C002,P010,Cafe,1,12.50
2025-01-04,C001,P020,Te,3,\"8,00\"
2025-01-05,C003,P020,Te,-1,8.00
2025-01-06,C004,P099,,2,doce
2025-01-04,C002,P010,Cafe,1,12.50
";

#[test]
fn test_every_row_lands_in_exactly_one_bucket() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", MIXED_DROP);
    ws.write_drop(
        "extra.jsonl",
        "{\"fecha\":\"2025-01-07\",\"id_cliente\":\"C005\",\"id_producto\":\"P030\",\"unidades\":4,\"precio_unitario\":2.5}\n\
         {\"fecha\":\"2025-01-07\",\"id_cliente\":\"\",\"id_producto\":\"P030\",\"unidades\":1,\"precio_unitario\":2.5}\n",
    );
    let store = MemoryStore::new();

    let report = run(&ws, &store);

    assert_eq!(report.files, 2);
    assert_eq!(report.counts.raw, 8);
    assert_eq!(report.counts.valid + report.counts.quarantined, report.counts.raw);
    assert_eq!(report.counts.valid, 5);
    assert_eq!(report.counts.quarantined, 3);
    assert_eq!(report.counts.duplicates_dropped, 1);
    assert_eq!(report.counts.inserted, 4);
    assert_eq!(store.count().unwrap(), 4);
    assert_eq!(store.raw_log_count().unwrap(), 8);

    let quarantine = read_quarantine(&ws.quarantine_path()).unwrap();
    assert_eq!(quarantine.len(), 3);
    let snapshot = read_snapshot(&ws.snapshot_path()).unwrap();
    assert_eq!(snapshot, store.query(&SalesFilter::all()).unwrap());
}

#[test]
fn test_later_copy_in_same_batch_wins() {
    let ws = Workspace::new();
    ws.write_drop(
        "ventas.csv",
        &format!("{HEADER6}\n2025-01-03,C001,P010,,2,12.50\n2025-01-03,C001,P010,,5,12.50\n"),
    );
    let store = MemoryStore::new();

    let report = run(&ws, &store);

    let row = store.get(&key(3, "C001", "P010")).unwrap().unwrap();
    assert_eq!(row.units, 5);
    assert_eq!(row.amount, Decimal::new(6250, 2));
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(report.counts.duplicates_dropped, 1);
    assert!(read_quarantine(&ws.quarantine_path()).unwrap().is_empty());
}

#[test]
fn test_invalid_month_gets_single_date_reason() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", &format!("{HEADER6}\n2025-13-01,C002,P002,,2,20.00\n"));
    let store = MemoryStore::new();

    run(&ws, &store);

    let rows = read_quarantine(&ws.quarantine_path()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reason_list(), vec!["date missing/invalid"]);
    assert_eq!(rows[0].fecha, "2025-13-01");
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_negative_units_in_five_column_drop() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", &format!("{HEADER5}\n2025-01-05,C003,P020,-1,8.00\n"));
    let store = MemoryStore::new();

    run(&ws, &store);

    let rows = read_quarantine(&ws.quarantine_path()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reasons, "units non-positive");
    assert_eq!(rows[0].unidades, "-1");
    assert_eq!(rows[0].origin_file, "ventas.csv");
}

#[test]
fn test_rerun_is_idempotent() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", MIXED_DROP);
    let store = MemoryStore::new();

    let first = run(&ws, &store);
    let table_after_first = store.query(&SalesFilter::all()).unwrap();
    let quarantine_after_first = read_quarantine(&ws.quarantine_path()).unwrap();

    let second = run(&ws, &store);

    assert_eq!(store.query(&SalesFilter::all()).unwrap(), table_after_first);
    assert_eq!(second.counts.inserted, 0);
    assert_eq!(second.counts.updated, 0);
    assert_eq!(second.unchanged, first.counts.upserted());
    assert_eq!(second.rerun_of.as_deref(), Some(first.batch_id.as_str()));

    // Quarantine is replaced, not appended to
    let quarantine = read_quarantine(&ws.quarantine_path()).unwrap();
    assert_eq!(quarantine.len(), quarantine_after_first.len());
    assert_eq!(quarantine[0].reasons, quarantine_after_first[0].reasons);

    // The raw log keeps every submission
    assert_eq!(store.raw_log_count().unwrap(), 2 * first.counts.raw as usize);
    assert_eq!(
        store.raw_log_for(&second.batch_id).unwrap().len(),
        second.counts.raw as usize
    );
}

#[test]
fn test_changed_resubmission_updates_row() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", &format!("{HEADER5}\n2025-01-03,C001,P010,2,12.50\n"));
    let store = MemoryStore::new();
    run(&ws, &store);

    ws.write_drop("ventas.csv", &format!("{HEADER5}\n2025-01-03,C001,P010,7,12.50\n"));
    let report = run(&ws, &store);

    assert_eq!(report.counts.updated, 1);
    assert!(report.rerun_of.is_none());
    let row = store.get(&key(3, "C001", "P010")).unwrap().unwrap();
    assert_eq!(row.units, 7);
    assert_eq!(row.amount, Decimal::new(8750, 2));
}

#[test]
fn test_per_row_timestamp_decides_winner() {
    let ws = Workspace::new();
    ws.write_drop(
        "a.csv",
        "fecha,id_cliente,id_producto,unidades,precio_unitario,ingested_at\n\
         2025-01-03,C001,P010,9,1.00,2025-01-06T12:00:00Z\n",
    );
    ws.write_drop(
        "b.csv",
        "fecha,id_cliente,id_producto,unidades,precio_unitario,ingested_at\n\
         2025-01-03,C001,P010,4,1.00,2025-01-06T08:00:00Z\n",
    );
    let store = MemoryStore::new();

    run(&ws, &store);

    // b.csv is read last but carries the older timestamp
    let row = store.get(&key(3, "C001", "P010")).unwrap().unwrap();
    assert_eq!(row.units, 9);
}

#[test]
fn test_keys_are_unique_after_run() {
    let ws = Workspace::new();
    let mut content = String::from(HEADER5);
    for i in 0..50 {
        content.push_str(&format!("\n2025-01-{:02},C00{},P010,{},1.00", 1 + i % 5, i % 3, 1 + i % 9));
    }
    content.push('\n');
    ws.write_drop("ventas.csv", &content);
    let store = MemoryStore::new();

    let report = run(&ws, &store);

    let rows = store.query(&SalesFilter::all()).unwrap();
    let mut keys: Vec<_> = rows.iter().map(CleanRecord::key).collect();
    keys.dedup();
    assert_eq!(keys.len(), rows.len());
    assert_eq!(rows.len(), 15);
    assert_eq!(report.counts.duplicates_dropped, 35);
}

#[test]
fn test_header_only_drop_writes_header_only_quarantine() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", &format!("{HEADER5}\n"));
    let store = MemoryStore::new();

    let report = run(&ws, &store);

    assert_eq!(report.counts.raw, 0);
    assert_eq!(
        fs::read_to_string(ws.quarantine_path()).unwrap(),
        "fecha,id_cliente,id_producto,unidades,precio_unitario,origin_file,ingested_at,reasons\n"
    );
    assert!(read_snapshot(&ws.snapshot_path()).unwrap().is_empty());
    assert!(store.list_batches(1).unwrap()[0].is_completed());
}

#[test]
fn test_bad_jsonl_aborts_before_any_write() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", MIXED_DROP);
    ws.write_drop("broken.jsonl", "{\"fecha\":\"2025-01-03\"}\nnot json\n");
    let store = MemoryStore::new();

    let err = PipelineExecutor::new(ws.config(), &store)
        .unwrap()
        .run()
        .unwrap_err();

    assert!(matches!(err, PipelineError::Ingest(_)));
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(store.raw_log_count().unwrap(), 0);
    assert!(!ws.quarantine_path().exists());
}

#[test]
fn test_source_dir_with_glob_metacharacters() {
    let ws = Workspace::new();
    let drops = ws.dir.path().join("drops[2025]");
    fs::create_dir(&drops).unwrap();
    fs::write(drops.join("ventas.csv"), MIXED_DROP).unwrap();
    let store = MemoryStore::new();

    let report = PipelineExecutor::new(ws.config().with_source(&drops), &store)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(report.counts.raw, 6);
    assert_eq!(store.count().unwrap(), 3);
}

/// Commit overlapping batches from several threads at once.
///
/// Every writer stamps all of its rows with its own number, so a row mixing
/// writers or a partially applied batch shows up as mismatched values.
fn commit_concurrently(store: &dyn CanonicalStore) {
    const WRITERS: u32 = 4;
    const KEYS: u32 = 25;

    store.init().unwrap();
    let ts = Utc::now().trunc_subsecs(6);

    let stats: Vec<MergeStats> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=WRITERS)
            .map(|writer| {
                scope.spawn(move || {
                    let origin = format!("writer-{writer}.csv");
                    let raw: Vec<RawRecord> =
                        (1..=KEYS).map(|_| RawRecord::new(origin.as_str(), ts)).collect();
                    let clean: Vec<CleanRecord> = (1..=KEYS)
                        .map(|day| {
                            CleanRecord::try_new(
                                date(2025, 1, day),
                                "C001",
                                "P010",
                                Some(format!("writer-{writer}")),
                                writer,
                                Decimal::from(writer),
                                ts,
                            )
                            .unwrap()
                        })
                        .collect();
                    let mut batch = BatchRecord::new(format!("b-{writer}"), "drops", ts);
                    store.commit_batch(&mut batch, &raw, &clean).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let rows = store.query(&SalesFilter::all()).unwrap();
    assert_eq!(rows.len(), KEYS as usize);
    let winner = rows[0].units;
    for row in &rows {
        assert_eq!(row.units, winner);
        assert_eq!(row.unit_price, Decimal::from(winner));
        assert_eq!(row.product_name, Some(format!("writer-{winner}")));
    }

    assert_eq!(stats.iter().map(|s| s.inserted).sum::<u64>(), u64::from(KEYS));
    assert_eq!(store.raw_log_count().unwrap(), (WRITERS * KEYS) as usize);
    let batches = store.list_batches(10).unwrap();
    assert_eq!(batches.len(), WRITERS as usize);
    assert!(batches.iter().all(|b| b.is_completed()));
}

#[test]
fn test_concurrent_commits_memory() {
    commit_concurrently(&MemoryStore::new());
}

/// Store whose batch commits always fail
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
}

impl CanonicalReader for FailingStore {
    fn get(&self, key: &BusinessKey) -> Result<Option<CleanRecord>, StoreError> {
        self.inner.get(key)
    }

    fn query(&self, filter: &SalesFilter) -> Result<Vec<CleanRecord>, StoreError> {
        self.inner.query(filter)
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.inner.count()
    }
}

impl CanonicalStore for FailingStore {
    fn init(&self) -> Result<(), StoreError> {
        self.inner.init()
    }

    fn commit_batch(
        &self,
        _batch: &mut BatchRecord,
        _raw: &[RawRecord],
        _clean: &[CleanRecord],
    ) -> Result<MergeStats, StoreError> {
        Err(StoreError::Database("disk full".to_string()))
    }

    fn record_failed_batch(&self, batch: &BatchRecord) -> Result<(), StoreError> {
        self.inner.record_failed_batch(batch)
    }

    fn list_batches(&self, limit: usize) -> Result<Vec<BatchRecord>, StoreError> {
        self.inner.list_batches(limit)
    }

    fn find_completed_by_digest(&self, digest: &str) -> Result<Option<BatchRecord>, StoreError> {
        self.inner.find_completed_by_digest(digest)
    }

    fn raw_log_count(&self) -> Result<usize, StoreError> {
        self.inner.raw_log_count()
    }
}

#[test]
fn test_failed_commit_is_recorded_and_writes_nothing() {
    let ws = Workspace::new();
    ws.write_drop("ventas.csv", MIXED_DROP);
    let store = FailingStore::default();

    let err = PipelineExecutor::new(ws.config().with_batch_id("b-fail"), &store)
        .unwrap()
        .run()
        .unwrap_err();

    assert!(matches!(err, PipelineError::Store(_)));
    assert_eq!(store.count().unwrap(), 0);
    assert!(!ws.quarantine_path().exists());
    assert!(!ws.snapshot_path().exists());

    let batches = store.list_batches(10).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].id, "b-fail");
    assert_eq!(batches[0].status, BatchStatus::Failed);
    assert_eq!(batches[0].counts.raw, 6);
    assert!(batches[0].error_message.as_deref().unwrap().contains("disk full"));
}

#[test]
fn test_sample_drop_end_to_end() {
    let ws = Workspace::new();
    sales_pipeline::sample::write_sample(&ws.drops(), false).unwrap();
    let store = MemoryStore::new();

    let report = run(&ws, &store);

    assert_eq!(report.counts.raw, 11);
    assert_eq!(report.counts.quarantined, 4);
    assert_eq!(report.counts.duplicates_dropped, 2);
    assert_eq!(report.canonical_rows, 5);
    let row = store.get(&key(5, "C003", "P020")).unwrap().unwrap();
    assert_eq!(row.units, 4);
}

#[cfg(feature = "duckdb-backend")]
mod duckdb_pipeline_tests {
    use super::*;
    use sales_pipeline::store::DuckDbStore;

    fn assert_file_exists(path: &Path) {
        assert!(path.exists(), "{} should exist", path.display());
    }

    #[test]
    fn test_full_pipeline_duckdb() {
        let ws = Workspace::new();
        ws.write_drop("ventas.csv", MIXED_DROP);
        let store = DuckDbStore::memory().expect("Failed to open duckdb");

        let first = run(&ws, &store);
        assert_eq!(first.counts.inserted, 3);
        assert_eq!(store.count().unwrap(), 3);
        assert_file_exists(&ws.quarantine_path());
        assert_file_exists(&ws.snapshot_path());

        let table = store.query(&SalesFilter::all()).unwrap();
        assert_eq!(read_snapshot(&ws.snapshot_path()).unwrap(), table);

        let second = run(&ws, &store);
        assert_eq!(second.counts.upserted(), 0);
        assert_eq!(second.rerun_of.as_deref(), Some(first.batch_id.as_str()));
        assert_eq!(store.query(&SalesFilter::all()).unwrap(), table);
        assert_eq!(store.raw_log_count().unwrap(), 12);

        let batches = store.list_batches(10).unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.is_completed()));
    }

    #[test]
    fn test_concurrent_commits_duckdb() {
        let store = DuckDbStore::memory().expect("Failed to open duckdb");
        commit_concurrently(&store);
    }

    #[test]
    fn test_duckdb_file_survives_reopen() {
        let ws = Workspace::new();
        ws.write_drop("ventas.csv", MIXED_DROP);
        let db_path = ws.dir.path().join("ventas.duckdb");

        {
            let store = DuckDbStore::open(&db_path.to_string_lossy()).unwrap();
            run(&ws, &store);
        }

        let store = DuckDbStore::open(&db_path.to_string_lossy()).unwrap();
        store.init().unwrap();
        assert_eq!(store.count().unwrap(), 3);
        let row = store.get(&key(4, "C001", "P020")).unwrap().unwrap();
        assert_eq!(row.unit_price, Decimal::new(800, 2));
        assert_eq!(row.product_name.as_deref(), Some("Te"));
    }
}
