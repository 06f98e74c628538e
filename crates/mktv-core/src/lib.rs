pub mod error;
pub mod store;
pub mod debounce;
pub mod progress;
pub mod session;
pub mod library;
pub mod catalog;

pub use error::{LibraryError, MalformedReport, SessionError, StoreError, TrackerError};
pub use store::{FileStore, MemoryStore, RecordStore, RemoteStore};
pub use debounce::Debouncer;
pub use progress::{load_progress, ProgressTracker, ReportOutcome, TrackerConfig, TrackerState};
pub use session::SessionContext;
pub use library::{CommentStore, WatchHistoryStore, WatchlistStore};
pub use catalog::Catalog;
