use mktv_models::{Collection, RecordKey, WatchProgress};
use std::sync::Arc;
use tracing::{debug, info};
use crate::error::LibraryError;
use crate::store::RecordStore;
use super::decode_records;

const DEFAULT_COMPLETED_THRESHOLD: f64 = 95.0;

/// Read side of the progress records written by the tracker
pub struct WatchHistoryStore {
    store: Arc<dyn RecordStore>,
    completed_threshold_percent: f64,
}

impl WatchHistoryStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            completed_threshold_percent: DEFAULT_COMPLETED_THRESHOLD,
        }
    }

    pub fn with_completed_threshold(mut self, percent: f64) -> Self {
        self.completed_threshold_percent = percent;
        self
    }

    /// Every progress record of the viewer, most recently updated first
    pub async fn list(&self, viewer_id: &str) -> Result<Vec<WatchProgress>, LibraryError> {
        let records = self.store.list_for_viewer(Collection::WatchHistory, viewer_id).await?;
        let mut history: Vec<WatchProgress> = decode_records(Collection::WatchHistory.name(), records);
        history.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        debug!(viewer_id = %viewer_id, count = history.len(), "Loaded watch history");
        Ok(history)
    }

    /// Started but unfinished titles, most recent first
    pub async fn continue_watching(&self, viewer_id: &str, limit: usize) -> Result<Vec<WatchProgress>, LibraryError> {
        let threshold = self.completed_threshold_percent;
        Ok(self
            .list(viewer_id)
            .await?
            .into_iter()
            .filter(|p| p.is_started() && !p.is_completed(threshold))
            .take(limit)
            .collect())
    }

    pub async fn remove(&self, viewer_id: &str, title_id: &str) -> Result<(), LibraryError> {
        self.store.delete(&RecordKey::progress(viewer_id, title_id)).await?;
        info!(viewer_id = %viewer_id, title_id = %title_id, "Removed title from watch history");
        Ok(())
    }

    /// Delete the viewer's whole history; returns how many records were removed
    pub async fn clear(&self, viewer_id: &str) -> Result<usize, LibraryError> {
        let history = self.list(viewer_id).await?;
        for record in &history {
            self.store.delete(&RecordKey::progress(viewer_id, &record.title_id)).await?;
        }
        info!(
            operation = "clear_history",
            viewer_id = %viewer_id,
            removed = history.len(),
            "Cleared watch history"
        );
        Ok(history.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use serde_json::json;

    async fn seed(store: &MemoryStore, viewer: &str, title: &str, current: f64, minutes_ago: i64) {
        let record = WatchProgress::from_times(viewer, title, current, 100.0, Utc::now() - Duration::minutes(minutes_ago));
        store
            .set(&RecordKey::progress(viewer, title), serde_json::to_value(&record).unwrap(), true)
            .await
            .unwrap();
    }

    async fn history() -> (Arc<MemoryStore>, WatchHistoryStore) {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "ana", "1", 50.0, 30).await;
        seed(&store, "ana", "2", 0.0, 20).await;
        seed(&store, "ana", "3", 97.0, 10).await;
        seed(&store, "ana", "4", 12.0, 5).await;
        seed(&store, "ben", "1", 80.0, 1).await;
        let history = WatchHistoryStore::new(store.clone());
        (store, history)
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_per_viewer() {
        let (_, history) = history().await;
        let titles: Vec<String> = history.list("ana").await.unwrap().into_iter().map(|p| p.title_id).collect();
        assert_eq!(titles, vec!["4", "3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_continue_watching_excludes_unstarted_and_finished() {
        let (_, history) = history().await;
        let titles: Vec<String> = history
            .continue_watching("ana", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title_id)
            .collect();
        assert_eq!(titles, vec!["4", "1"]);

        assert_eq!(history.continue_watching("ana", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_completed_threshold() {
        let (store, _) = history().await;
        let history = WatchHistoryStore::new(store).with_completed_threshold(40.0);
        let titles: Vec<String> = history
            .continue_watching("ana", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title_id)
            .collect();
        assert_eq!(titles, vec!["4"]);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (store, history) = history().await;
        history.remove("ana", "2").await.unwrap();
        assert_eq!(history.list("ana").await.unwrap().len(), 3);

        assert_eq!(history.clear("ana").await.unwrap(), 3);
        assert!(history.list("ana").await.unwrap().is_empty());
        assert_eq!(history.list("ben").await.unwrap().len(), 1);
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let (store, history) = history().await;
        store
            .set(&RecordKey::progress("ana", "bad"), json!({"viewerId": "ana", "currentTime": "x"}), false)
            .await
            .unwrap();
        assert_eq!(history.list("ana").await.unwrap().len(), 4);
    }
}
