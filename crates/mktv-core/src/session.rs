use chrono::{DateTime, Utc};
use mktv_models::Viewer;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use crate::error::SessionError;

/// Current-viewer context, passed to whatever needs viewer identity
///
/// Clones share the same state. Subscribers see every sign-in and sign-out.
#[derive(Clone)]
pub struct SessionContext {
    sender: Arc<watch::Sender<Option<Viewer>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::signed_out()
    }
}

impl SessionContext {
    pub fn signed_out() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_viewer(viewer: Viewer) -> Self {
        let (sender, _) = watch::channel(Some(viewer));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Option<Viewer> {
        self.sender.borrow().clone()
    }

    pub fn viewer_id(&self) -> Option<String> {
        self.sender.borrow().as_ref().map(|v| v.id.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.sender.borrow().is_some()
    }

    pub fn require_viewer(&self) -> Result<Viewer, SessionError> {
        self.current().ok_or(SessionError::NotSignedIn)
    }

    pub fn sign_in(&self, viewer: Viewer) {
        info!(viewer_id = %viewer.id, "Session started");
        self.sender.send_replace(Some(viewer));
    }

    /// Replace the tokens of the signed-in viewer without notifying a change of identity
    pub fn update_tokens(&self, id_token: String, refresh_token: String, expires_at: DateTime<Utc>) {
        self.sender.send_if_modified(|current| {
            if let Some(viewer) = current {
                viewer.id_token = id_token;
                viewer.refresh_token = refresh_token;
                viewer.expires_at = expires_at;
                debug!(viewer_id = %viewer.id, "Session tokens refreshed");
            }
            false
        });
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.sender.send_replace(None) {
            info!(viewer_id = %previous.id, "Session ended");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Viewer>> {
        self.sender.subscribe()
    }

    /// Run `callback` on every session change until the context is dropped
    pub fn on_change<F, Fut>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(Option<Viewer>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let viewer = receiver.borrow_and_update().clone();
                callback(viewer).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn viewer(id: &str) -> Viewer {
        Viewer {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            display_name: None,
            id_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_signed_out_by_default() {
        let session = SessionContext::default();
        assert!(session.current().is_none());
        assert_eq!(session.require_viewer(), Err(SessionError::NotSignedIn));
    }

    #[test]
    fn test_clones_share_state() {
        let session = SessionContext::signed_out();
        let other = session.clone();
        session.sign_in(viewer("ana"));
        assert_eq!(other.viewer_id().as_deref(), Some("ana"));

        other.sign_out();
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let session = SessionContext::signed_out();
        let mut receiver = session.subscribe();

        session.sign_in(viewer("ana"));
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow_and_update().as_ref().map(|v| v.id.clone()), Some("ana".to_string()));

        session.sign_out();
        receiver.changed().await.unwrap();
        assert!(receiver.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn test_token_refresh_is_not_an_identity_change() {
        let session = SessionContext::with_viewer(viewer("ana"));
        let receiver = session.subscribe();

        session.update_tokens("new".to_string(), "r2".to_string(), Utc::now());
        assert!(!receiver.has_changed().unwrap());
        assert_eq!(session.current().unwrap().id_token, "new");
    }

    #[tokio::test]
    async fn test_on_change_callback() {
        let session = SessionContext::signed_out();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = session.on_change(move |viewer| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(viewer.map(|v| v.id));
            }
        });

        session.sign_in(viewer("ana"));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        session.sign_out();
        drop(session);
        handle.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Some("ana".to_string()), None]);
    }
}
