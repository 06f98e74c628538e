use mktv_models::comment::MAX_COMMENT_CHARS;
use mktv_models::{Collection, Comment, RecordKey, Viewer};
use std::sync::Arc;
use tracing::{info, warn};
use crate::error::{LibraryError, StoreError};
use crate::store::RecordStore;
use super::decode_records;

const TITLE_FIELD: &str = "titleId";

/// Per-title comment threads
///
/// Comments are keyed by `(author, comment id)`, so only the author's key
/// addresses a comment; deletes by anyone else are refused.
pub struct CommentStore {
    store: Arc<dyn RecordStore>,
}

impl CommentStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn post(&self, author: &Viewer, title_id: &str, content: &str) -> Result<Comment, LibraryError> {
        let content = validate_content(content)?;
        let comment = Comment::new(author.id.clone(), author.name(), title_id, content);

        let key = RecordKey::new(Collection::Comments, &comment.viewer_id, &comment.id);
        let value = serde_json::to_value(&comment).map_err(StoreError::from)?;
        self.store.set(&key, value, false).await?;

        info!(viewer_id = %author.id, title_id = %title_id, comment_id = %comment.id, "Comment posted");
        Ok(comment)
    }

    /// Comments on a title, oldest first
    pub async fn list_for_title(&self, title_id: &str) -> Result<Vec<Comment>, LibraryError> {
        let records = self.store.query(Collection::Comments, TITLE_FIELD, title_id).await?;
        let mut comments: Vec<Comment> = decode_records(Collection::Comments.name(), records);
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    pub async fn delete(&self, viewer_id: &str, title_id: &str, comment_id: &str) -> Result<(), LibraryError> {
        let comment = self
            .list_for_title(title_id)
            .await?
            .into_iter()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| LibraryError::NotFound(format!("comment {}", comment_id)))?;

        if comment.viewer_id != viewer_id {
            warn!(
                viewer_id = %viewer_id,
                author_id = %comment.viewer_id,
                comment_id = %comment_id,
                "Refusing to delete another viewer's comment"
            );
            return Err(LibraryError::Forbidden {
                viewer_id: viewer_id.to_string(),
                resource: format!("comment {}", comment_id),
            });
        }

        self.store
            .delete(&RecordKey::new(Collection::Comments, &comment.viewer_id, &comment.id))
            .await?;
        info!(viewer_id = %viewer_id, comment_id = %comment_id, "Comment deleted");
        Ok(())
    }
}

fn validate_content(content: &str) -> Result<&str, LibraryError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::InvalidComment("comment is empty".to_string()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_COMMENT_CHARS {
        return Err(LibraryError::InvalidComment(format!(
            "comment is {} characters, the limit is {}",
            chars, MAX_COMMENT_CHARS
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn viewer(id: &str, display_name: Option<&str>) -> Viewer {
        Viewer {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            display_name: display_name.map(String::from),
            id_token: String::new(),
            refresh_token: String::new(),
            expires_at: Utc::now(),
        }
    }

    fn comments() -> CommentStore {
        CommentStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_post_and_list_oldest_first() {
        let comments = comments();
        let ana = viewer("ana", Some("Ana"));
        let ben = viewer("ben", None);

        comments.post(&ana, "550", "  first!  ").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        comments.post(&ben, "550", "second").await.unwrap();
        comments.post(&ben, "13", "other title").await.unwrap();

        let thread = comments.list_for_title("550").await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].content, "first!");
        assert_eq!(thread[0].viewer_name, "Ana");
        assert_eq!(thread[1].viewer_name, "ben");
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_content() {
        let comments = comments();
        let ana = viewer("ana", None);

        assert!(matches!(
            comments.post(&ana, "550", "   ").await,
            Err(LibraryError::InvalidComment(_))
        ));
        let long = "x".repeat(MAX_COMMENT_CHARS + 1);
        assert!(matches!(
            comments.post(&ana, "550", &long).await,
            Err(LibraryError::InvalidComment(_))
        ));
        let at_limit = "é".repeat(MAX_COMMENT_CHARS);
        assert!(comments.post(&ana, "550", &at_limit).await.is_ok());
    }

    #[tokio::test]
    async fn test_only_author_may_delete() {
        let comments = comments();
        let ana = viewer("ana", None);
        let posted = comments.post(&ana, "550", "mine").await.unwrap();

        let err = comments.delete("ben", "550", &posted.id).await.unwrap_err();
        assert!(matches!(err, LibraryError::Forbidden { .. }));
        assert_eq!(comments.list_for_title("550").await.unwrap().len(), 1);

        comments.delete("ana", "550", &posted.id).await.unwrap();
        assert!(comments.list_for_title("550").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_comment() {
        let comments = comments();
        let err = comments.delete("ana", "550", "missing").await.unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(_)));
    }
}
