use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum accepted comment length in characters
pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub viewer_id: String,
    pub viewer_name: String,
    pub title_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        viewer_id: impl Into<String>,
        viewer_name: impl Into<String>,
        title_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            viewer_id: viewer_id.into(),
            viewer_name: viewer_name.into(),
            title_id: title_id.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
