use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::media::MediaType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub viewer_id: String,
    pub title_id: String,
    pub media_type: MediaType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    pub added_at: DateTime<Utc>,
}
