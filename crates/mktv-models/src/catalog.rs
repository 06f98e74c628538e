use serde::{Deserialize, Serialize};
use crate::media::MediaType;

/// Display record for grids and search results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleCard {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<u32>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub overview: String,
}

/// Display record for a detail page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleDetails {
    pub card: TitleCard,
    pub genres: Vec<String>,
    pub runtime_minutes: Option<u32>,
    pub tagline: Option<String>,
    pub backdrop_path: Option<String>,
    /// Season numbers for TV; empty for movies
    pub seasons: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeCard {
    pub id: u64,
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    pub overview: String,
    pub still_path: Option<String>,
    pub runtime_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonEpisodes {
    pub show_id: u64,
    pub season_number: u32,
    pub name: String,
    pub episodes: Vec<EpisodeCard>,
}

/// Ordered group of episodes derived from an episode group ("Part 1", "Part 2", ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub order: u32,
    pub name: String,
    pub episodes: Vec<EpisodeCard>,
}
