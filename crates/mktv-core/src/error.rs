use mktv_sources::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or write rejected
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    /// Stored bytes could not be decoded
    #[error("corrupt record at {key}: {message}")]
    Corrupt { key: String, message: String },
    #[error("record store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SourceError> for StoreError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Decode { message, .. } => StoreError::Corrupt {
                key: "<remote>".to_string(),
                message,
            },
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Why a position report was discarded
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MalformedReport {
    #[error("current time {0} is negative")]
    NegativeTime(f64),
    #[error("current time is not finite")]
    NonFiniteTime,
    #[error("duration {0} is negative")]
    NegativeDuration(f64),
    #[error("duration is not finite")]
    NonFiniteDuration,
    #[error("percentage is not finite")]
    NonFinitePercent,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("progress storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),
    /// Lookup could not be completed; distinct from "no progress recorded"
    #[error("could not read progress for {viewer_id}/{title_id}: {reason}")]
    ReadFailure {
        viewer_id: String,
        title_id: String,
        reason: String,
    },
    #[error("malformed position report: {0}")]
    MalformedReport(#[from] MalformedReport),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid comment: {0}")]
    InvalidComment(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("viewer {viewer_id} may not modify {resource}")]
    Forbidden { viewer_id: String, resource: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("not signed in; run `mktv login` first")]
    NotSignedIn,
}
