//! Viewer library collections: watch history, watchlist and comments

mod history;
mod watchlist;
mod comments;

pub use history::WatchHistoryStore;
pub use watchlist::WatchlistStore;
pub use comments::CommentStore;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Decode stored records, skipping (and logging) any that no longer parse
pub(crate) fn decode_records<T: DeserializeOwned>(collection: &str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<T>(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(collection = %collection, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}
