//! Per-record document storage keyed by `(collection, viewer, item)`

mod memory;
mod file;
mod remote;

pub use memory::MemoryStore;
pub use file::FileStore;
pub use remote::RemoteStore;

use async_trait::async_trait;
use mktv_models::{Collection, RecordKey};
use serde_json::Value;
use crate::error::StoreError;

/// Field every record carries for its owning viewer
pub const VIEWER_FIELD: &str = "viewerId";

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend_name(&self) -> &str;

    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError>;

    /// Write a record. With `merge`, top-level fields are overlaid on the
    /// existing document; otherwise the document is replaced. Last write wins.
    async fn set(&self, key: &RecordKey, record: Value, merge: bool) -> Result<(), StoreError>;

    /// Delete a record; deleting a missing record succeeds
    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError>;

    /// Records in `collection` whose top-level string `field` equals `value`
    async fn query(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Value>, StoreError>;

    async fn list_for_viewer(&self, collection: Collection, viewer_id: &str) -> Result<Vec<Value>, StoreError> {
        self.query(collection, VIEWER_FIELD, viewer_id).await
    }
}

/// Overlay `incoming` onto `existing` (merge) or replace it
pub(crate) fn merge_record(existing: Option<Value>, incoming: Value, merge: bool) -> Value {
    match (existing, incoming, merge) {
        (Some(Value::Object(mut current)), Value::Object(fields), true) => {
            for (k, v) in fields {
                current.insert(k, v);
            }
            Value::Object(current)
        }
        (_, incoming, _) => incoming,
    }
}

pub(crate) fn field_equals(record: &Value, field: &str, value: &str) -> bool {
    record.get(field).and_then(Value::as_str) == Some(value)
}
