pub mod traits;
pub mod error;
pub mod tmdb;
pub mod auth;
pub mod docdb;

pub use traits::MetadataSource;
pub use error::SourceError;
pub use tmdb::TmdbClient;
pub use auth::{AuthSession, IdentityClient};
pub use docdb::{DocumentDbClient, StoredDocument};

use std::time::Duration;

/// Applied to every outbound request so a stalled service cannot hang a command
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client(service: &'static str) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SourceError::request(service, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_client_gets_the_request_timeout() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(30));
        assert!(http_client("docdb").is_ok());
    }
}
