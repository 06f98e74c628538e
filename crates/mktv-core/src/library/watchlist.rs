use chrono::Utc;
use mktv_models::{Collection, MediaType, RecordKey, WatchlistEntry};
use std::sync::Arc;
use tracing::{debug, info};
use crate::error::{LibraryError, StoreError};
use crate::store::RecordStore;
use super::decode_records;

pub struct WatchlistStore {
    store: Arc<dyn RecordStore>,
}

impl WatchlistStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Add a title; adding one that is already listed returns the existing entry
    pub async fn add(
        &self,
        viewer_id: &str,
        title_id: &str,
        media_type: MediaType,
        title: &str,
        poster_path: Option<String>,
    ) -> Result<WatchlistEntry, LibraryError> {
        let key = RecordKey::watchlist(viewer_id, title_id);
        if let Some(existing) = self.get(&key).await? {
            debug!(key = %key, "Title already on watchlist");
            return Ok(existing);
        }

        let entry = WatchlistEntry {
            viewer_id: viewer_id.to_string(),
            title_id: title_id.to_string(),
            media_type,
            title: title.to_string(),
            poster_path,
            added_at: Utc::now(),
        };
        let value = serde_json::to_value(&entry).map_err(StoreError::from)?;
        self.store.set(&key, value, false).await?;
        info!(viewer_id = %viewer_id, title_id = %title_id, "Added to watchlist");
        Ok(entry)
    }

    pub async fn remove(&self, viewer_id: &str, title_id: &str) -> Result<(), LibraryError> {
        self.store.delete(&RecordKey::watchlist(viewer_id, title_id)).await?;
        info!(viewer_id = %viewer_id, title_id = %title_id, "Removed from watchlist");
        Ok(())
    }

    pub async fn contains(&self, viewer_id: &str, title_id: &str) -> Result<bool, LibraryError> {
        Ok(self.get(&RecordKey::watchlist(viewer_id, title_id)).await?.is_some())
    }

    /// Newest additions first
    pub async fn list(&self, viewer_id: &str) -> Result<Vec<WatchlistEntry>, LibraryError> {
        let records = self.store.list_for_viewer(Collection::Watchlist, viewer_id).await?;
        let mut entries: Vec<WatchlistEntry> = decode_records(Collection::Watchlist.name(), records);
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(entries)
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<WatchlistEntry>, LibraryError> {
        match self.store.get(key).await? {
            Some(value) => Ok(serde_json::from_value(value).ok()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn watchlist() -> (Arc<MemoryStore>, WatchlistStore) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), WatchlistStore::new(store))
    }

    #[tokio::test]
    async fn test_add_contains_remove() {
        let (_, watchlist) = watchlist();
        assert!(!watchlist.contains("ana", "550").await.unwrap());

        let entry = watchlist
            .add("ana", "550", MediaType::Movie, "Fight Club", Some("/poster.jpg".to_string()))
            .await
            .unwrap();
        assert_eq!(entry.title, "Fight Club");
        assert!(watchlist.contains("ana", "550").await.unwrap());
        assert!(!watchlist.contains("ben", "550").await.unwrap());

        watchlist.remove("ana", "550").await.unwrap();
        assert!(!watchlist.contains("ana", "550").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_twice_is_idempotent() {
        let (store, watchlist) = watchlist();
        let first = watchlist.add("ana", "1399", MediaType::Tv, "Game of Thrones", None).await.unwrap();
        let second = watchlist.add("ana", "1399", MediaType::Tv, "Game of Thrones", None).await.unwrap();

        assert_eq!(first.added_at, second.added_at);
        assert_eq!(store.write_count(), 1);
        assert_eq!(watchlist.list("ana").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_, watchlist) = watchlist();
        watchlist.add("ana", "1", MediaType::Movie, "One", None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        watchlist.add("ana", "2", MediaType::Movie, "Two", None).await.unwrap();

        let titles: Vec<String> = watchlist.list("ana").await.unwrap().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Two", "One"]);
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let (_, watchlist) = watchlist();
        watchlist.remove("ana", "nope").await.unwrap();
    }
}
