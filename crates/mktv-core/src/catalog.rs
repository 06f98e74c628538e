//! Display-ready views over the metadata source
//!
//! The raw listings mix movies, shows and people with provider-specific field
//! names. Everything here reshapes them into the card/detail records the CLI
//! renders; the shaping functions are pure so they can be tested without a
//! network.

use mktv_models::{EpisodeCard, MediaInfo, MediaType, Part, SeasonEpisodes, TitleCard, TitleDetails};
use mktv_sources::tmdb::{
    TimeWindow, TmdbEpisode, TmdbEpisodeGroup, TmdbEpisodeGroupSummary, TmdbListItem, TmdbMovieDetails,
    TmdbSeason, TmdbTvDetails, TrendingMedia,
};
use mktv_sources::{MetadataSource, SourceError};
use std::sync::Arc;
use tracing::debug;

pub struct Catalog {
    source: Arc<dyn MetadataSource>,
}

impl Catalog {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    pub async fn trending(&self, media: TrendingMedia, window: TimeWindow) -> Result<Vec<TitleCard>, SourceError> {
        let fallback = match media {
            TrendingMedia::Movie => Some(MediaType::Movie),
            TrendingMedia::Tv => Some(MediaType::Tv),
            TrendingMedia::All => None,
        };
        let items = self.source.trending(media, window).await?;
        Ok(to_cards(items, fallback))
    }

    pub async fn popular(&self, media_type: MediaType, page: u32) -> Result<Vec<TitleCard>, SourceError> {
        let items = self.source.popular(media_type, page).await?;
        Ok(to_cards(items, Some(media_type)))
    }

    /// Multi search; people are dropped from the results
    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<TitleCard>, SourceError> {
        let items = self.source.search(query, page).await?;
        let cards = to_cards(items, None);
        debug!(query = %query, results = cards.len(), "Search complete");
        Ok(cards)
    }

    pub async fn movie(&self, id: u64) -> Result<TitleDetails, SourceError> {
        Ok(movie_details(self.source.movie_details(id).await?))
    }

    pub async fn tv(&self, id: u64) -> Result<TitleDetails, SourceError> {
        Ok(tv_details(self.source.tv_details(id).await?))
    }

    pub async fn details(&self, media_type: MediaType, id: u64) -> Result<TitleDetails, SourceError> {
        match media_type {
            MediaType::Movie => self.movie(id).await,
            MediaType::Tv => self.tv(id).await,
        }
    }

    pub async fn season(&self, show_id: u64, season_number: u32) -> Result<SeasonEpisodes, SourceError> {
        let season = self.source.season(show_id, season_number).await?;
        Ok(season_episodes(show_id, season))
    }

    /// The show's episodes arranged in parts, from its best-matching episode group
    ///
    /// Returns an empty list when the show has no episode groups.
    pub async fn parts(&self, show_id: u64) -> Result<Vec<Part>, SourceError> {
        let summaries = self.source.episode_groups(show_id).await?;
        let Some(chosen) = pick_parts_group(&summaries) else {
            debug!(show_id, "Show has no episode groups");
            return Ok(Vec::new());
        };
        debug!(show_id, group = %chosen.name, "Using episode group for parts");
        let group = self.source.episode_group(&chosen.id).await?;
        Ok(group_to_parts(group))
    }

    /// Display metadata stored alongside progress records
    pub async fn media_info(
        &self,
        media_type: MediaType,
        id: u64,
        episode: Option<(u32, u32)>,
    ) -> Result<MediaInfo, SourceError> {
        let details = self.details(media_type, id).await?;
        let mut info = match episode {
            Some((season, number)) => MediaInfo::episode(details.card.title, season, number),
            None => MediaInfo::movie(details.card.title),
        };
        info.media_type = media_type;
        info.poster_path = details.card.poster_path;
        Ok(info)
    }
}

/// First four digits of a `YYYY-MM-DD` date
fn year_of(date: Option<&str>) -> Option<u32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

fn media_type_of(item: &TmdbListItem, fallback: Option<MediaType>) -> Option<MediaType> {
    match item.media_type.as_deref() {
        Some("movie") => Some(MediaType::Movie),
        Some("tv") => Some(MediaType::Tv),
        Some(_) => None,
        None => fallback.or(if item.title.is_some() {
            Some(MediaType::Movie)
        } else if item.name.is_some() {
            Some(MediaType::Tv)
        } else {
            None
        }),
    }
}

/// Card for a listing entry; `None` for people and untitled entries
pub fn to_card(item: TmdbListItem, fallback: Option<MediaType>) -> Option<TitleCard> {
    let media_type = media_type_of(&item, fallback)?;
    let (title, date) = match media_type {
        MediaType::Movie => (item.title.or(item.name), item.release_date.or(item.first_air_date)),
        MediaType::Tv => (item.name.or(item.title), item.first_air_date.or(item.release_date)),
    };
    let title = title.filter(|t| !t.trim().is_empty())?;

    Some(TitleCard {
        id: item.id,
        media_type,
        title,
        year: year_of(date.as_deref()),
        poster_path: item.poster_path,
        vote_average: item.vote_average,
        overview: item.overview.unwrap_or_default(),
    })
}

pub fn to_cards(items: Vec<TmdbListItem>, fallback: Option<MediaType>) -> Vec<TitleCard> {
    items.into_iter().filter_map(|item| to_card(item, fallback)).collect()
}

pub fn movie_details(movie: TmdbMovieDetails) -> TitleDetails {
    TitleDetails {
        card: TitleCard {
            id: movie.id,
            media_type: MediaType::Movie,
            title: movie.title,
            year: year_of(movie.release_date.as_deref()),
            poster_path: movie.poster_path,
            vote_average: movie.vote_average,
            overview: movie.overview.unwrap_or_default(),
        },
        genres: movie.genres.into_iter().map(|g| g.name).collect(),
        runtime_minutes: movie.runtime.filter(|r| *r > 0),
        tagline: movie.tagline.filter(|t| !t.is_empty()),
        backdrop_path: movie.backdrop_path,
        seasons: Vec::new(),
    }
}

pub fn tv_details(show: TmdbTvDetails) -> TitleDetails {
    let mut seasons: Vec<u32> = show.seasons.iter().map(|s| s.season_number).collect();
    seasons.sort_unstable();

    TitleDetails {
        card: TitleCard {
            id: show.id,
            media_type: MediaType::Tv,
            title: show.name,
            year: year_of(show.first_air_date.as_deref()),
            poster_path: show.poster_path,
            vote_average: show.vote_average,
            overview: show.overview.unwrap_or_default(),
        },
        genres: show.genres.into_iter().map(|g| g.name).collect(),
        runtime_minutes: show.episode_run_time.first().copied(),
        tagline: show.tagline.filter(|t| !t.is_empty()),
        backdrop_path: show.backdrop_path,
        seasons,
    }
}

fn episode_card(episode: TmdbEpisode) -> EpisodeCard {
    EpisodeCard {
        id: episode.id,
        season_number: episode.season_number,
        episode_number: episode.episode_number,
        name: episode
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Episode {}", episode.episode_number)),
        overview: episode.overview.unwrap_or_default(),
        still_path: episode.still_path,
        runtime_minutes: episode.runtime,
    }
}

pub fn season_episodes(show_id: u64, season: TmdbSeason) -> SeasonEpisodes {
    let mut episodes: Vec<EpisodeCard> = season.episodes.into_iter().map(episode_card).collect();
    episodes.sort_by_key(|e| e.episode_number);

    SeasonEpisodes {
        show_id,
        season_number: season.season_number,
        name: season
            .name
            .unwrap_or_else(|| format!("Season {}", season.season_number)),
        episodes,
    }
}

/// Prefer a group named like "Parts"; otherwise the first one listed
pub fn pick_parts_group(groups: &[TmdbEpisodeGroupSummary]) -> Option<&TmdbEpisodeGroupSummary> {
    groups
        .iter()
        .find(|g| g.name.to_lowercase().contains("part"))
        .or_else(|| groups.first())
}

/// Ordered parts with episodes in their in-group order
pub fn group_to_parts(group: TmdbEpisodeGroup) -> Vec<Part> {
    let mut groups = group.groups;
    groups.sort_by_key(|g| g.order);

    groups
        .into_iter()
        .map(|g| {
            let mut episodes = g.episodes;
            episodes.sort_by_key(|e| (e.order.unwrap_or(u32::MAX), e.season_number, e.episode_number));
            Part {
                order: g.order,
                name: g.name,
                episodes: episodes.into_iter().map(episode_card).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mktv_sources::tmdb::{TmdbGenre, TmdbGroup, TmdbSeasonSummary};

    fn item(id: u64, media_type: Option<&str>, title: Option<&str>, name: Option<&str>) -> TmdbListItem {
        TmdbListItem {
            id,
            media_type: media_type.map(String::from),
            title: title.map(String::from),
            name: name.map(String::from),
            release_date: title.map(|_| "1999-10-15".to_string()),
            first_air_date: name.map(|_| "2011-04-17".to_string()),
            poster_path: None,
            vote_average: Some(8.0),
            overview: None,
        }
    }

    fn episode(id: u64, season: u32, number: u32, order: Option<u32>) -> TmdbEpisode {
        TmdbEpisode {
            id,
            name: Some(format!("E{}", id)),
            overview: None,
            season_number: season,
            episode_number: number,
            still_path: None,
            runtime: Some(50),
            order,
        }
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of(Some("1999-10-15")), Some(1999));
        assert_eq!(year_of(Some("")), None);
        assert_eq!(year_of(Some("soon")), None);
        assert_eq!(year_of(None), None);
    }

    #[test]
    fn test_multi_search_drops_people() {
        let items = vec![
            item(550, Some("movie"), Some("Fight Club"), None),
            item(287, Some("person"), None, Some("Brad Pitt")),
            item(1399, Some("tv"), None, Some("Game of Thrones")),
        ];
        let cards = to_cards(items, None);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].year, Some(1999));
        assert_eq!(cards[1].media_type, MediaType::Tv);
        assert_eq!(cards[1].year, Some(2011));
    }

    #[test]
    fn test_listing_without_media_type_uses_fallback() {
        let card = to_card(item(1, None, None, Some("Dark")), Some(MediaType::Tv)).unwrap();
        assert_eq!(card.media_type, MediaType::Tv);
        assert_eq!(card.title, "Dark");

        let inferred = to_card(item(2, None, Some("Heat"), None), None).unwrap();
        assert_eq!(inferred.media_type, MediaType::Movie);
    }

    #[test]
    fn test_untitled_entries_are_dropped() {
        assert!(to_card(item(3, Some("movie"), Some("  "), None), None).is_none());
        assert!(to_card(item(4, None, None, None), None).is_none());
    }

    #[test]
    fn test_tv_details_sorts_seasons() {
        let show = TmdbTvDetails {
            id: 1399,
            name: "Game of Thrones".to_string(),
            overview: Some("Winter is coming".to_string()),
            first_air_date: Some("2011-04-17".to_string()),
            poster_path: None,
            backdrop_path: None,
            vote_average: None,
            genres: vec![TmdbGenre { id: 18, name: "Drama".to_string() }],
            episode_run_time: vec![60, 55],
            tagline: Some(String::new()),
            seasons: vec![
                TmdbSeasonSummary { season_number: 2, name: None, episode_count: None },
                TmdbSeasonSummary { season_number: 0, name: None, episode_count: None },
                TmdbSeasonSummary { season_number: 1, name: None, episode_count: None },
            ],
        };
        let details = tv_details(show);
        assert_eq!(details.seasons, vec![0, 1, 2]);
        assert_eq!(details.runtime_minutes, Some(60));
        assert_eq!(details.tagline, None);
        assert_eq!(details.genres, vec!["Drama"]);
    }

    #[test]
    fn test_pick_parts_group() {
        let summary = |id: &str, name: &str| TmdbEpisodeGroupSummary {
            id: id.to_string(),
            name: name.to_string(),
            group_type: None,
            group_count: None,
            episode_count: None,
        };
        let groups = vec![summary("a", "DVD Order"), summary("b", "Netflix Parts")];
        assert_eq!(pick_parts_group(&groups).unwrap().id, "b");
        assert_eq!(pick_parts_group(&groups[..1]).unwrap().id, "a");
        assert!(pick_parts_group(&[]).is_none());
    }

    #[test]
    fn test_group_to_parts_orders_groups_and_episodes() {
        let group = TmdbEpisodeGroup {
            id: "g".to_string(),
            name: "Parts".to_string(),
            groups: vec![
                TmdbGroup {
                    id: None,
                    name: "Part 2".to_string(),
                    order: 2,
                    episodes: vec![episode(21, 1, 9, Some(1)), episode(20, 1, 8, Some(0))],
                },
                TmdbGroup {
                    id: None,
                    name: "Part 1".to_string(),
                    order: 1,
                    episodes: vec![episode(12, 1, 3, Some(2)), episode(10, 1, 1, Some(0)), episode(11, 1, 2, Some(1))],
                },
            ],
        };
        let parts = group_to_parts(group);
        assert_eq!(parts.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["Part 1", "Part 2"]);
        assert_eq!(parts[0].episodes.iter().map(|e| e.id).collect::<Vec<_>>(), vec![10, 11, 12]);
        assert_eq!(parts[1].episodes.iter().map(|e| e.episode_number).collect::<Vec<_>>(), vec![8, 9]);
    }

    #[test]
    fn test_season_episodes_names_fallback() {
        let mut unnamed = episode(5, 2, 1, None);
        unnamed.name = None;
        let season = TmdbSeason {
            name: None,
            season_number: 2,
            episodes: vec![episode(6, 2, 2, None), unnamed],
        };
        let view = season_episodes(42, season);
        assert_eq!(view.name, "Season 2");
        assert_eq!(view.episodes[0].name, "Episode 1");
        assert_eq!(view.episodes[1].episode_number, 2);
    }

    struct FakeSource {
        groups: Vec<TmdbEpisodeGroupSummary>,
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        fn source_name(&self) -> &str {
            "fake"
        }

        async fn trending(&self, _media: TrendingMedia, _window: TimeWindow) -> Result<Vec<TmdbListItem>, SourceError> {
            Ok(vec![item(1, None, Some("Heat"), None), item(2, None, None, Some("Dark"))])
        }

        async fn popular(&self, _media_type: MediaType, _page: u32) -> Result<Vec<TmdbListItem>, SourceError> {
            Ok(vec![item(3, None, None, Some("Dark"))])
        }

        async fn search(&self, _query: &str, _page: u32) -> Result<Vec<TmdbListItem>, SourceError> {
            Ok(vec![item(287, Some("person"), None, Some("Brad Pitt"))])
        }

        async fn movie_details(&self, id: u64) -> Result<TmdbMovieDetails, SourceError> {
            Ok(TmdbMovieDetails {
                id,
                title: "Heat".to_string(),
                overview: None,
                release_date: Some("1995-12-15".to_string()),
                poster_path: Some("/heat.jpg".to_string()),
                backdrop_path: None,
                vote_average: None,
                genres: Vec::new(),
                runtime: Some(170),
                tagline: None,
            })
        }

        async fn tv_details(&self, id: u64) -> Result<TmdbTvDetails, SourceError> {
            Err(SourceError::NotFound { service: "fake", path: format!("/tv/{}", id) })
        }

        async fn season(&self, show_id: u64, season_number: u32) -> Result<TmdbSeason, SourceError> {
            Err(SourceError::NotFound { service: "fake", path: format!("/tv/{}/season/{}", show_id, season_number) })
        }

        async fn episode_groups(&self, _show_id: u64) -> Result<Vec<TmdbEpisodeGroupSummary>, SourceError> {
            Ok(self.groups.clone())
        }

        async fn episode_group(&self, group_id: &str) -> Result<TmdbEpisodeGroup, SourceError> {
            Ok(TmdbEpisodeGroup {
                id: group_id.to_string(),
                name: "Parts".to_string(),
                groups: vec![TmdbGroup {
                    id: None,
                    name: "Part 1".to_string(),
                    order: 1,
                    episodes: vec![episode(1, 1, 1, Some(0))],
                }],
            })
        }
    }

    fn catalog(groups: Vec<TmdbEpisodeGroupSummary>) -> Catalog {
        Catalog::new(Arc::new(FakeSource { groups }))
    }

    #[tokio::test]
    async fn test_trending_all_infers_media_types() {
        let cards = catalog(Vec::new()).trending(TrendingMedia::All, TimeWindow::Week).await.unwrap();
        assert_eq!(cards[0].media_type, MediaType::Movie);
        assert_eq!(cards[1].media_type, MediaType::Tv);
    }

    #[tokio::test]
    async fn test_search_with_only_people_is_empty() {
        assert!(catalog(Vec::new()).search("pitt", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parts_without_groups_is_empty() {
        assert!(catalog(Vec::new()).parts(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parts_from_group() {
        let groups = vec![TmdbEpisodeGroupSummary {
            id: "abc".to_string(),
            name: "Parts".to_string(),
            group_type: Some(6),
            group_count: Some(1),
            episode_count: Some(1),
        }];
        let parts = catalog(groups).parts(1).await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].episodes.len(), 1);
    }

    #[tokio::test]
    async fn test_media_info_for_movie() {
        let info = catalog(Vec::new()).media_info(MediaType::Movie, 949, None).await.unwrap();
        assert_eq!(info.title, "Heat");
        assert_eq!(info.poster_path.as_deref(), Some("/heat.jpg"));
        assert_eq!(info.season, None);
    }

    #[tokio::test]
    async fn test_not_found_propagates() {
        let err = catalog(Vec::new()).tv(9).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
