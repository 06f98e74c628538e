use async_trait::async_trait;
use mktv_models::MediaType;
use crate::error::SourceError;
use crate::tmdb::{
    TimeWindow, TmdbEpisodeGroup, TmdbEpisodeGroupSummary, TmdbListItem, TmdbMovieDetails,
    TmdbSeason, TmdbTvDetails, TrendingMedia,
};

/// Read-only movie/TV metadata provider
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn source_name(&self) -> &str;

    // Listings
    async fn trending(&self, media: TrendingMedia, window: TimeWindow) -> Result<Vec<TmdbListItem>, SourceError>;
    async fn popular(&self, media_type: MediaType, page: u32) -> Result<Vec<TmdbListItem>, SourceError>;
    async fn search(&self, query: &str, page: u32) -> Result<Vec<TmdbListItem>, SourceError>;

    // Details
    async fn movie_details(&self, id: u64) -> Result<TmdbMovieDetails, SourceError>;
    async fn tv_details(&self, id: u64) -> Result<TmdbTvDetails, SourceError>;
    async fn season(&self, show_id: u64, season_number: u32) -> Result<TmdbSeason, SourceError>;

    // Episode groups (alternative orderings such as "parts" or volumes)
    async fn episode_groups(&self, show_id: u64) -> Result<Vec<TmdbEpisodeGroupSummary>, SourceError>;
    async fn episode_group(&self, group_id: &str) -> Result<TmdbEpisodeGroup, SourceError>;
}
