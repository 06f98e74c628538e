use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media filter for the trending endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendingMedia {
    #[default]
    All,
    Movie,
    Tv,
}

impl TrendingMedia {
    pub fn as_path(&self) -> &'static str {
        match self {
            TrendingMedia::All => "all",
            TrendingMedia::Movie => "movie",
            TrendingMedia::Tv => "tv",
        }
    }
}

impl FromStr for TrendingMedia {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TrendingMedia::All),
            "movie" => Ok(TrendingMedia::Movie),
            "tv" => Ok(TrendingMedia::Tv),
            other => Err(format!("Invalid trending media: {}. Use 'all', 'movie' or 'tv'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_path(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            other => Err(format!("Invalid time window: {}. Use 'day' or 'week'", other)),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmdbPage<T> {
    #[allow(dead_code)]
    pub page: u32,
    pub results: Vec<T>,
}

/// Entry of a trending, popular or search listing
///
/// Movies carry `title`/`release_date`, shows carry `name`/`first_air_date`.
/// `media_type` is only present on mixed listings (trending/all, multi search).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbListItem {
    pub id: u64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub overview: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbGenre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbMovieDetails {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbSeasonSummary {
    pub season_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbTvDetails {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeasonSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbEpisode {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    pub season_number: u32,
    pub episode_number: u32,
    #[serde(default)]
    pub still_path: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    /// Position inside an episode group; absent on season listings
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbSeason {
    #[serde(default)]
    pub name: Option<String>,
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbEpisodeGroupSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub group_type: Option<u32>,
    #[serde(default)]
    pub group_count: Option<u32>,
    #[serde(default)]
    pub episode_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmdbEpisodeGroupList {
    pub results: Vec<TmdbEpisodeGroupSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbGroup {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbEpisodeGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<TmdbGroup>,
}
