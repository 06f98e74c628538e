use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated viewer as returned by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Viewer {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub id_token: String,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Viewer {
    /// Name shown next to comments; falls back to the local part of the email
    pub fn name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.email.split('@').next().unwrap_or_default().to_string(),
        }
    }

    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(display_name: Option<&str>) -> Viewer {
        Viewer {
            id: "uid".to_string(),
            email: "ana@example.com".to_string(),
            display_name: display_name.map(String::from),
            id_token: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_name_falls_back_to_email() {
        assert_eq!(viewer(None).name(), "ana");
        assert_eq!(viewer(Some("  ")).name(), "ana");
        assert_eq!(viewer(Some("Ana B")).name(), "Ana B");
    }

    #[test]
    fn test_tokens_not_serialized() {
        let json = serde_json::to_string(&viewer(None)).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("refresh"));
    }
}
