use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "tv" | "show" | "series" => Ok(MediaType::Tv),
            other => Err(format!("Unknown media type: {}. Use 'movie' or 'tv'", other)),
        }
    }
}

/// Display metadata stored alongside a progress record
///
/// Lets history listings render without another metadata lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub title: String,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

impl MediaInfo {
    pub fn movie(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            media_type: MediaType::Movie,
            poster_path: None,
            season: None,
            episode: None,
        }
    }

    pub fn episode(show_title: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            title: show_title.into(),
            media_type: MediaType::Tv,
            poster_path: None,
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// "Title" for movies, "Title S01E02" for episodes
    pub fn label(&self) -> String {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => format!("{} S{:02}E{:02}", self.title, s, e),
            _ => self.title.clone(),
        }
    }
}
