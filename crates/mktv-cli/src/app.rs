use chrono::Utc;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use mktv_config::{Config, CredentialStore, PathManager, StorageBackend};
use mktv_core::{Catalog, FileStore, MemoryStore, RecordStore, RemoteStore, SessionContext};
use mktv_models::Viewer;
use mktv_sources::{DocumentDbClient, IdentityClient, TmdbClient};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Viewer id used for file and memory stores when nobody is signed in
const LOCAL_VIEWER_ID: &str = "local";

/// Everything a command needs, wired once per invocation
pub struct App {
    config: Config,
    paths: PathManager,
    credentials: Mutex<CredentialStore>,
    session: SessionContext,
    store: Arc<dyn RecordStore>,
    remote: Option<DocumentDbClient>,
    backend_name: &'static str,
}

impl App {
    pub async fn load(paths: PathManager, offline: bool) -> Result<Self> {
        let config_file = paths.config_file();
        let mut config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
        config.apply_env_overrides();
        config.validate().wrap_err("Invalid configuration")?;

        let mut credentials = CredentialStore::new(paths.credentials_file());
        credentials
            .load()
            .map_err(|e| eyre!("Failed to load credentials from {}: {}", paths.credentials_file().display(), e))?;

        let session = match restore_viewer(&credentials) {
            Some(viewer) => SessionContext::with_viewer(viewer),
            None => SessionContext::signed_out(),
        };

        let backend = if offline { StorageBackend::Memory } else { config.storage.backend };
        let mut remote = None;
        let store: Arc<dyn RecordStore> = match backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => {
                let dir = paths.records_dir();
                Arc::new(FileStore::new(&dir).wrap_err_with(|| format!("Failed to open record store at {}", dir.display()))?)
            }
            StorageBackend::Remote => {
                let backend_config = config.backend.as_ref().ok_or_else(|| eyre!("[backend] is not configured"))?;
                let client = DocumentDbClient::new(backend_config).map_err(|e| eyre!("{}", e))?;
                remote = Some(client.clone());
                Arc::new(RemoteStore::new(client))
            }
        };
        let backend_name = match backend {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
            StorageBackend::Remote => "remote",
        };
        debug!(backend = backend_name, offline, "Record store ready");

        let app = Self {
            config,
            paths,
            credentials: Mutex::new(credentials),
            session,
            store,
            remote,
            backend_name,
        };
        app.refresh_tokens_if_needed().await;
        app.attach_token();
        Ok(app)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &PathManager {
        &self.paths
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn identity(&self) -> Result<IdentityClient> {
        let backend = self
            .config
            .backend
            .as_ref()
            .filter(|_| self.config.is_backend_configured())
            .ok_or_else(|| eyre!("No account backend configured. Add a [backend] section to {}", self.paths.config_file().display()))?;
        IdentityClient::new(backend).map_err(|e| eyre!("{}", e))
    }

    pub fn catalog(&self) -> Result<Catalog> {
        let tmdb = self.config.require_tmdb().wrap_err("Catalog commands need a TMDB API key")?;
        let client = TmdbClient::new(tmdb).map_err(|e| eyre!("{}", e))?;
        Ok(Catalog::new(Arc::new(client)))
    }

    /// The viewer records are written for
    ///
    /// The hosted database requires a signed-in viewer; local stores fall
    /// back to a single local profile.
    pub fn viewer(&self) -> Result<Viewer> {
        if let Some(viewer) = self.session.current() {
            return Ok(viewer);
        }
        if self.remote.is_some() {
            return Err(eyre!("{}", mktv_core::SessionError::NotSignedIn));
        }
        Ok(Viewer {
            id: LOCAL_VIEWER_ID.to_string(),
            email: format!("{}@localhost", LOCAL_VIEWER_ID),
            display_name: Some("Local viewer".to_string()),
            id_token: String::new(),
            refresh_token: String::new(),
            expires_at: Utc::now(),
        })
    }

    /// Persist a new session and make it current
    pub fn save_session(&self, viewer: &Viewer) -> Result<()> {
        self.store_credentials(viewer)?;
        self.session.sign_in(viewer.clone());
        self.attach_token();
        Ok(())
    }

    fn store_credentials(&self, viewer: &Viewer) -> Result<()> {
        let mut credentials = self.credentials.lock().map_err(|_| eyre!("credential store lock poisoned"))?;
        credentials.set_viewer_id(viewer.id.clone());
        credentials.set_viewer_email(viewer.email.clone());
        if let Some(name) = &viewer.display_name {
            credentials.set_display_name(name.clone());
        }
        credentials.set_id_token(viewer.id_token.clone());
        credentials.set_refresh_token(viewer.refresh_token.clone());
        credentials.set_token_expires(viewer.expires_at);
        credentials.save().map_err(|e| eyre!("Failed to save credentials: {}", e))
    }

    pub fn clear_session(&self) -> Result<()> {
        let mut credentials = self.credentials.lock().map_err(|_| eyre!("credential store lock poisoned"))?;
        credentials.clear_session();
        credentials.save().map_err(|e| eyre!("Failed to save credentials: {}", e))?;
        drop(credentials);

        self.session.sign_out();
        self.attach_token();
        Ok(())
    }

    fn attach_token(&self) {
        if let Some(remote) = &self.remote {
            remote.set_id_token(self.session.current().map(|v| v.id_token).filter(|t| !t.is_empty()));
        }
    }

    /// Exchange the refresh token when the stored ID token has expired
    ///
    /// Failures leave the session as it is; the next request reports the
    /// authentication error.
    async fn refresh_tokens_if_needed(&self) {
        let Some(viewer) = self.session.current() else { return };
        if !viewer.token_expired(Utc::now()) || viewer.refresh_token.is_empty() {
            return;
        }
        let identity = match self.identity() {
            Ok(identity) => identity,
            Err(_) => return,
        };

        match identity.refresh(&viewer.refresh_token).await {
            Ok(session) => {
                info!(viewer_id = %viewer.id, "Refreshed expired session token");
                let refreshed = Viewer {
                    id_token: session.id_token.clone(),
                    refresh_token: session.refresh_token.clone(),
                    expires_at: session.expires_at,
                    ..viewer
                };
                if let Err(e) = self.store_credentials(&refreshed) {
                    warn!(error = %e, "Could not store refreshed token");
                }
                self.session
                    .update_tokens(session.id_token, session.refresh_token, session.expires_at);
            }
            Err(e) => warn!(viewer_id = %viewer.id, error = %e, "Token refresh failed"),
        }
    }
}

fn restore_viewer(credentials: &CredentialStore) -> Option<Viewer> {
    let id = credentials.get_viewer_id()?.clone();
    Some(Viewer {
        id,
        email: credentials.get_viewer_email().cloned().unwrap_or_default(),
        display_name: credentials.get_display_name().cloned(),
        id_token: credentials.get_id_token().cloned().unwrap_or_default(),
        refresh_token: credentials.get_refresh_token().cloned().unwrap_or_default(),
        expires_at: credentials.get_token_expires().unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_viewer_requires_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut credentials = CredentialStore::new(dir.path().join("credentials.toml"));
        assert!(restore_viewer(&credentials).is_none());

        credentials.set_viewer_id("uid".to_string());
        credentials.set_viewer_email("ana@example.com".to_string());
        let viewer = restore_viewer(&credentials).unwrap();
        assert_eq!(viewer.id, "uid");
        assert_eq!(viewer.name(), "ana");
        assert!(viewer.id_token.is_empty());
    }

    #[tokio::test]
    async fn test_offline_app_uses_local_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::load(PathManager::rooted_at(dir.path()), true).await.unwrap();
        assert_eq!(app.backend_name(), "memory");
        assert_eq!(app.viewer().unwrap().id, LOCAL_VIEWER_ID);
    }
}
