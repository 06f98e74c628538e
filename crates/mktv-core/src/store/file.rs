use async_trait::async_trait;
use mktv_models::{Collection, RecordKey};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::error::StoreError;
use super::{field_equals, merge_record, RecordStore};

type Documents = Map<String, Value>;

/// JSON documents on disk, one file per collection
///
/// Each file maps document IDs to records. Files are loaded lazily and kept in
/// memory; every write rewrites the collection file atomically (temp file + rename).
pub struct FileStore {
    dir: PathBuf,
    collections: Mutex<HashMap<Collection, Documents>>,
}

impl FileStore {
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            collections: Mutex::new(HashMap::new()),
        })
    }

    fn collection_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }

    /// Read a collection file; a corrupt file is backed up and treated as empty
    async fn read_collection(&self, collection: Collection) -> Result<Documents, StoreError> {
        let path = self.collection_path(collection);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Record file miss: {} (file does not exist)", collection);
                return Ok(Documents::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        match serde_json::from_str::<Documents>(&content) {
            Ok(documents) => {
                debug!("Loaded {} {} records", documents.len(), collection);
                Ok(documents)
            }
            Err(e) => {
                let backup_path = path.with_extension("json.bak");
                if let Err(backup_err) = tokio::fs::rename(&path, &backup_path).await {
                    warn!(
                        "Corrupt record file {:?} ({}), and backing it up failed: {}. Starting empty.",
                        path, e, backup_err
                    );
                } else {
                    info!(
                        "Corrupt record file {:?} ({}). Moved it to {:?} and starting empty.",
                        path, e, backup_path
                    );
                }
                Ok(Documents::new())
            }
        }
    }

    async fn write_collection(&self, collection: Collection, documents: &Documents) -> Result<(), StoreError> {
        let path = self.collection_path(collection);
        let json = serde_json::to_string_pretty(documents)?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn ensure_loaded(
        &self,
        collections: &mut HashMap<Collection, Documents>,
        collection: Collection,
    ) -> Result<(), StoreError> {
        if !collections.contains_key(&collection) {
            let documents = self.read_collection(collection).await?;
            collections.insert(collection, documents);
        }
        Ok(())
    }

    /// Run `f` against a loaded collection while holding the store lock
    async fn with_collection<R>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut Documents) -> R,
    ) -> Result<R, StoreError> {
        let mut collections = self.collections.lock().await;
        self.ensure_loaded(&mut collections, collection).await?;
        let documents = collections.entry(collection).or_default();
        Ok(f(documents))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    fn backend_name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        let id = key.document_id();
        self.with_collection(key.collection, |docs| docs.get(&id).cloned()).await
    }

    async fn set(&self, key: &RecordKey, record: Value, merge: bool) -> Result<(), StoreError> {
        let id = key.document_id();
        let mut collections = self.collections.lock().await;
        self.ensure_loaded(&mut collections, key.collection).await?;
        let documents = collections.entry(key.collection).or_default();
        let merged = merge_record(documents.remove(&id), record, merge);
        documents.insert(id, merged);
        self.write_collection(key.collection, documents).await
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        let id = key.document_id();
        let mut collections = self.collections.lock().await;
        self.ensure_loaded(&mut collections, key.collection).await?;
        let documents = collections.entry(key.collection).or_default();
        if documents.remove(&id).is_some() {
            self.write_collection(key.collection, documents).await?;
        }
        Ok(())
    }

    async fn query(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Value>, StoreError> {
        self.with_collection(collection, |docs| {
            docs.values()
                .filter(|record| field_equals(record, field, value))
                .cloned()
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let key = RecordKey::watchlist("v1", "550");
        {
            let store = FileStore::new(dir.path()).unwrap();
            store.set(&key, json!({"viewerId": "v1", "title": "Fight Club"}), false).await.unwrap();
        }

        let reopened = FileStore::new(dir.path()).unwrap();
        let record = reopened.get(&key).await.unwrap().unwrap();
        assert_eq!(record["title"], "Fight Club");
        assert!(dir.path().join("watchlist.json").exists());
    }

    #[tokio::test]
    async fn test_merge_write() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let key = RecordKey::progress("v1", "550");
        store.set(&key, json!({"viewerId": "v1", "currentTime": 1.0, "media": {"title": "X"}}), true).await.unwrap();
        store.set(&key, json!({"currentTime": 5.0}), true).await.unwrap();

        let record = store.get(&key).await.unwrap().unwrap();
        assert_eq!(record["currentTime"], 5.0);
        assert_eq!(record["media"]["title"], "X");
    }

    #[tokio::test]
    async fn test_delete_and_query() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        for (viewer, title) in [("a", "1"), ("a", "2"), ("b", "1")] {
            let key = RecordKey::progress(viewer, title);
            store.set(&key, json!({"viewerId": viewer, "titleId": title}), false).await.unwrap();
        }

        assert_eq!(store.list_for_viewer(Collection::WatchHistory, "a").await.unwrap().len(), 2);
        store.delete(&RecordKey::progress("a", "1")).await.unwrap();
        store.delete(&RecordKey::progress("a", "missing")).await.unwrap();
        assert_eq!(store.list_for_viewer(Collection::WatchHistory, "a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("comments.json"), "{not json").unwrap();

        let store = FileStore::new(dir.path()).unwrap();
        let records = store.query(Collection::Comments, "titleId", "550").await.unwrap();
        assert!(records.is_empty());
        assert!(dir.path().join("comments.json.bak").exists());
    }
}
