use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Flat key/value TOML file holding the signed-in viewer's tokens
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_viewer_id(&self) -> Option<&String> {
        self.get("viewer_id")
    }

    pub fn set_viewer_id(&mut self, id: String) {
        self.set("viewer_id".to_string(), id);
    }

    pub fn get_viewer_email(&self) -> Option<&String> {
        self.get("viewer_email")
    }

    pub fn set_viewer_email(&mut self, email: String) {
        self.set("viewer_email".to_string(), email);
    }

    pub fn get_display_name(&self) -> Option<&String> {
        self.get("display_name")
    }

    pub fn set_display_name(&mut self, name: String) {
        self.set("display_name".to_string(), name);
    }

    pub fn get_id_token(&self) -> Option<&String> {
        self.get("id_token")
    }

    pub fn set_id_token(&mut self, token: String) {
        self.set("id_token".to_string(), token);
    }

    pub fn get_refresh_token(&self) -> Option<&String> {
        self.get("refresh_token")
    }

    pub fn set_refresh_token(&mut self, token: String) {
        self.set("refresh_token".to_string(), token);
    }

    pub fn get_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get("token_expires")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_token_expires(&mut self, expires: DateTime<Utc>) {
        self.set("token_expires".to_string(), expires.to_rfc3339());
    }

    /// Forget the signed-in viewer
    pub fn clear_session(&mut self) {
        for key in ["viewer_id", "viewer_email", "display_name", "id_token", "refresh_token", "token_expires"] {
            self.remove(key);
        }
    }
}
