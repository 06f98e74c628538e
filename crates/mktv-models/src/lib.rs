pub mod media;
pub mod record_key;
pub mod progress;
pub mod watchlist;
pub mod comment;
pub mod viewer;
pub mod catalog;

pub use media::{MediaInfo, MediaType};
pub use record_key::{Collection, RecordKey};
pub use progress::{progress_percent, PlayerMessage, ProgressReport, WatchProgress};
pub use watchlist::WatchlistEntry;
pub use comment::Comment;
pub use viewer::Viewer;
pub use catalog::{EpisodeCard, Part, SeasonEpisodes, TitleCard, TitleDetails};
