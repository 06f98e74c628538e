use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{service} rejected the credentials: {message}")]
    Unauthorized { service: &'static str, message: String },
    #[error("{service} has no resource at {path}")]
    NotFound { service: &'static str, path: String },
    #[error("{service} request failed with status {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned an unexpected payload: {message}")]
    Decode { service: &'static str, message: String },
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn new(message: String) -> Self {
        SourceError::Other(message)
    }

    pub fn request(service: &'static str, source: reqwest::Error) -> Self {
        SourceError::Request { service, source }
    }

    pub fn decode(service: &'static str, message: impl ToString) -> Self {
        SourceError::Decode { service, message: message.to_string() }
    }

    /// Transport-level failures where retrying later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Request { .. } => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}
