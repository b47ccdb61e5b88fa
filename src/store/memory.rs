//! In-process canonical store

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{
    BatchRecord, BatchStatus, CanonicalReader, CanonicalStore, MergeAction, MergeStats,
    SalesFilter, StoreError, merge_action,
};
use crate::models::{BusinessKey, CleanRecord, RawRecord};

/// One raw-log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogEntry {
    pub batch_id: String,
    pub row_hash: String,
    pub record: RawRecord,
}

#[derive(Debug, Default, Clone)]
struct MemoryState {
    table: BTreeMap<BusinessKey, CleanRecord>,
    raw_log: Vec<RawLogEntry>,
    batches: Vec<BatchRecord>,
}

/// Canonical store held in memory.
///
/// Writers are serialized by a mutex; a batch is merged into a copy of the table
/// that replaces the live one only when the whole batch has been applied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw-log entries for one batch, in append order
    pub fn raw_log_for(&self, batch_id: &str) -> Result<Vec<RawLogEntry>, StoreError> {
        let state = self.state.lock()?;
        Ok(state
            .raw_log
            .iter()
            .filter(|entry| entry.batch_id == batch_id)
            .cloned()
            .collect())
    }

    fn upsert_batch(batches: &mut Vec<BatchRecord>, batch: &BatchRecord) {
        match batches.iter_mut().find(|b| b.id == batch.id) {
            Some(existing) => *existing = batch.clone(),
            None => batches.push(batch.clone()),
        }
    }
}

impl CanonicalReader for MemoryStore {
    fn get(&self, key: &BusinessKey) -> Result<Option<CleanRecord>, StoreError> {
        Ok(self.state.lock()?.table.get(key).cloned())
    }

    fn query(&self, filter: &SalesFilter) -> Result<Vec<CleanRecord>, StoreError> {
        let state = self.state.lock()?;
        Ok(state
            .table
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock()?.table.len())
    }
}

impl CanonicalStore for MemoryStore {
    fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn commit_batch(
        &self,
        batch: &mut BatchRecord,
        raw: &[RawRecord],
        clean: &[CleanRecord],
    ) -> Result<MergeStats, StoreError> {
        let mut state = self.state.lock()?;

        let mut table = state.table.clone();
        let mut stats = MergeStats::default();
        for record in clean {
            let key = record.key();
            let action = merge_action(table.get(&key), record);
            if action != MergeAction::Unchanged {
                table.insert(key, record.clone());
            }
            stats.record(action);
        }

        batch.counts.inserted = stats.inserted;
        batch.counts.updated = stats.updated;
        batch.complete();

        state.table = table;
        state.raw_log.extend(raw.iter().map(|record| RawLogEntry {
            batch_id: batch.id.clone(),
            row_hash: record.row_hash(),
            record: record.clone(),
        }));
        Self::upsert_batch(&mut state.batches, batch);

        Ok(stats)
    }

    fn record_failed_batch(&self, batch: &BatchRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock()?;
        Self::upsert_batch(&mut state.batches, batch);
        Ok(())
    }

    fn list_batches(&self, limit: usize) -> Result<Vec<BatchRecord>, StoreError> {
        let state = self.state.lock()?;
        let mut batches = state.batches.clone();
        batches.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        batches.truncate(limit);
        Ok(batches)
    }

    fn find_completed_by_digest(&self, digest: &str) -> Result<Option<BatchRecord>, StoreError> {
        let state = self.state.lock()?;
        Ok(state
            .batches
            .iter()
            .filter(|b| b.status == BatchStatus::Completed && b.source_digest == digest)
            .max_by_key(|b| b.started_at)
            .cloned())
    }

    fn raw_log_count(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock()?.raw_log.len())
    }
}
