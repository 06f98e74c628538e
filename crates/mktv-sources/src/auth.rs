use chrono::{DateTime, Duration, Utc};
use mktv_config::BackendConfig;
use mktv_models::Viewer;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::error::SourceError;

const SERVICE: &str = "identity";
const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Tokens issued by the identity provider
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub viewer_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn into_viewer(self, fallback_email: &str) -> Viewer {
        Viewer {
            id: self.viewer_id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            display_name: self.display_name,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
        }
    }
}

/// Expiry with a two-minute safety margin, like the token refresh elsewhere
fn expires_at(expires_in: &str) -> DateTime<Utc> {
    let seconds = expires_in.parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds((seconds - 120).max(0))
}

/// Map provider error codes (`EMAIL_NOT_FOUND`, `INVALID_PASSWORD`, ...) to errors
fn map_error(status: u16, body: &str) -> SourceError {
    let code = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    // Codes may carry a suffix: "WEAK_PASSWORD : Password should be at least 6 characters"
    let head = code.split(':').next().unwrap_or_default().trim();
    match head {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "INVALID_REFRESH_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => SourceError::Unauthorized {
            service: SERVICE,
            message: head.to_string(),
        },
        _ => SourceError::Status {
            service: SERVICE,
            status,
            body: code,
        },
    }
}

/// Email/password client for the hosted identity provider
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    api_key: String,
    identity_url: String,
    token_url: String,
}

impl IdentityClient {
    pub fn new(config: &BackendConfig) -> Result<Self, SourceError> {
        let (identity_url, token_url) = match &config.auth_base_url {
            // Emulators serve both APIs under one host
            Some(base) => {
                let base = base.trim_end_matches('/');
                (
                    format!("{}/identitytoolkit.googleapis.com/v1", base),
                    format!("{}/securetoken.googleapis.com/v1/token", base),
                )
            }
            None => (IDENTITY_URL.to_string(), TOKEN_URL.to_string()),
        };

        Ok(Self {
            client: crate::http_client(SERVICE)?,
            api_key: config.api_key.clone(),
            identity_url,
            token_url,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, SourceError> {
        let session = self.password_call("accounts:signInWithPassword", email, password).await?;
        info!(viewer_id = %session.viewer_id, "Signed in");
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, SourceError> {
        let session = self.password_call("accounts:signUp", email, password).await?;
        info!(viewer_id = %session.viewer_id, "Created account");
        Ok(session)
    }

    async fn password_call(&self, action: &str, email: &str, password: &str) -> Result<AuthSession, SourceError> {
        let url = format!("{}/{}", self.identity_url, action);
        let payload = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| SourceError::request(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error(status.as_u16(), &body));
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| SourceError::decode(SERVICE, e))?;

        Ok(AuthSession {
            viewer_id: body.local_id,
            email: Some(body.email),
            display_name: body.display_name.filter(|n| !n.is_empty()),
            expires_at: expires_at(&body.expires_in),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        })
    }

    /// Exchange a refresh token for a fresh ID token
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, SourceError> {
        let response = self
            .client
            .post(&self.token_url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| SourceError::request(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error(status.as_u16(), &body));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| SourceError::decode(SERVICE, e))?;

        debug!(viewer_id = %body.user_id, "Refreshed ID token");

        Ok(AuthSession {
            viewer_id: body.user_id,
            email: None,
            display_name: None,
            expires_at: expires_at(&body.expires_in),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_credentials() {
        let body = r#"{"error": {"code": 400, "message": "INVALID_PASSWORD"}}"#;
        assert!(matches!(map_error(400, body), SourceError::Unauthorized { .. }));
    }

    #[test]
    fn test_map_error_with_suffix() {
        let body = r#"{"error": {"code": 400, "message": "WEAK_PASSWORD : Password should be at least 6 characters"}}"#;
        match map_error(400, body) {
            SourceError::Status { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.starts_with("WEAK_PASSWORD"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_map_error_non_json_body() {
        assert!(matches!(map_error(502, "Bad Gateway"), SourceError::Status { status: 502, .. }));
    }

    #[test]
    fn test_expires_at_keeps_margin() {
        let at = expires_at("3600");
        let remaining = (at - Utc::now()).num_seconds();
        assert!(remaining > 3400 && remaining <= 3480);
    }

    #[test]
    fn test_emulator_urls() {
        let config = BackendConfig {
            project_id: "demo".to_string(),
            api_key: "k".to_string(),
            auth_base_url: Some("http://localhost:9099/".to_string()),
            database_base_url: None,
        };
        let client = IdentityClient::new(&config).unwrap();
        assert_eq!(client.identity_url, "http://localhost:9099/identitytoolkit.googleapis.com/v1");
        assert_eq!(client.token_url, "http://localhost:9099/securetoken.googleapis.com/v1/token");
    }

    #[test]
    fn test_session_into_viewer_uses_fallback_email() {
        let session = AuthSession {
            viewer_id: "uid".to_string(),
            email: None,
            display_name: None,
            id_token: "t".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now(),
        };
        assert_eq!(session.into_viewer("me@example.com").email, "me@example.com");
    }
}
