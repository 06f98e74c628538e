use async_trait::async_trait;
use mktv_models::{Collection, RecordKey};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use crate::error::StoreError;
use super::{field_equals, merge_record, RecordStore};

/// Process-local store, used for `--offline` sessions and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(Collection, String), Value>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail with `Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&(key.collection, key.document_id())).cloned())
    }

    async fn set(&self, key: &RecordKey, record: Value, merge: bool) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is rejecting writes".to_string()));
        }
        let mut records = self.records.write().await;
        let slot = (key.collection, key.document_id());
        let merged = merge_record(records.remove(&slot), record, merge);
        records.insert(slot, merged);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.records.write().await.remove(&(key.collection, key.document_id()));
        Ok(())
    }

    async fn query(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Value>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|((c, _), record)| *c == collection && field_equals(record, field, value))
            .map(|(_, record)| record.clone())
            .collect())
    }
}
