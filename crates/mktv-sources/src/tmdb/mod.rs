pub mod api;
pub mod client;

pub use api::{
    TimeWindow, TmdbEpisode, TmdbEpisodeGroup, TmdbEpisodeGroupSummary, TmdbGenre, TmdbGroup,
    TmdbListItem, TmdbMovieDetails, TmdbSeason, TmdbSeasonSummary, TmdbTvDetails, TrendingMedia,
};
pub use client::TmdbClient;
