use serde::{Deserialize, Serialize};
use std::fmt;

/// Document collections in the per-viewer record store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Collection {
    WatchHistory,
    Watchlist,
    Comments,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::WatchHistory => "watchHistory",
            Collection::Watchlist => "watchlist",
            Collection::Comments => "comments",
        }
    }

    pub fn all() -> [Collection; 3] {
        [Collection::WatchHistory, Collection::Watchlist, Collection::Comments]
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Composite key addressing one document: `(collection, viewer, item)`
///
/// Rendered as the document ID `"{viewer_id}_{item_id}"` within the collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub collection: Collection,
    pub viewer_id: String,
    pub item_id: String,
}

impl RecordKey {
    pub fn new(collection: Collection, viewer_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            collection,
            viewer_id: viewer_id.into(),
            item_id: item_id.into(),
        }
    }

    pub fn progress(viewer_id: &str, title_id: &str) -> Self {
        Self::new(Collection::WatchHistory, viewer_id, title_id)
    }

    pub fn watchlist(viewer_id: &str, title_id: &str) -> Self {
        Self::new(Collection::Watchlist, viewer_id, title_id)
    }

    pub fn document_id(&self) -> String {
        format!("{}_{}", self.viewer_id, self.item_id)
    }

    /// Document path relative to the database root, e.g. `watchlist/uid_550`
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection.name(), self.document_id())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_composite() {
        let key = RecordKey::progress("viewer1", "movie-550");
        assert_eq!(key.document_id(), "viewer1_movie-550");
        assert_eq!(key.path(), "watchHistory/viewer1_movie-550");
    }

    #[test]
    fn test_keys_differ_by_collection() {
        let a = RecordKey::progress("v", "1");
        let b = RecordKey::watchlist("v", "1");
        assert_ne!(a, b);
        assert_eq!(a.document_id(), b.document_id());
    }
}
