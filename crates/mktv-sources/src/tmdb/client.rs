use async_trait::async_trait;
use mktv_config::TmdbConfig;
use mktv_models::MediaType;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::error::SourceError;
use crate::tmdb::api::{
    TimeWindow, TmdbEpisodeGroup, TmdbEpisodeGroupList, TmdbEpisodeGroupSummary, TmdbListItem,
    TmdbMovieDetails, TmdbPage, TmdbSeason, TmdbTvDetails, TrendingMedia,
};
use crate::traits::MetadataSource;

const SERVICE: &str = "tmdb";

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Result<Self, SourceError> {
        if config.api_key.trim().is_empty() {
            return Err(SourceError::Unauthorized {
                service: SERVICE,
                message: "API key cannot be empty".to_string(),
            });
        }

        let client = crate::http_client(SERVICE)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a TMDB path and decode the JSON body
    async fn get<T>(&self, path: &str, extra: &[(&str, String)]) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("language", self.language.clone()),
        ];
        params.extend(extra.iter().cloned());

        debug!(path = %path, "TMDB request");

        let response = self
            .client
            .get(self.url(path))
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::request(SERVICE, e))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => {
                return Err(SourceError::Unauthorized {
                    service: SERVICE,
                    message: "API key is invalid or missing".to_string(),
                });
            }
            StatusCode::NOT_FOUND => {
                return Err(SourceError::NotFound {
                    service: SERVICE,
                    path: path.to_string(),
                });
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Status {
                    service: SERVICE,
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::decode(SERVICE, format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    fn source_name(&self) -> &str {
        SERVICE
    }

    async fn trending(&self, media: TrendingMedia, window: TimeWindow) -> Result<Vec<TmdbListItem>, SourceError> {
        let path = format!("/trending/{}/{}", media.as_path(), window.as_path());
        let page: TmdbPage<TmdbListItem> = self.get(&path, &[]).await?;
        Ok(page.results)
    }

    async fn popular(&self, media_type: MediaType, page: u32) -> Result<Vec<TmdbListItem>, SourceError> {
        let path = format!("/{}/popular", media_type.as_str());
        let page: TmdbPage<TmdbListItem> = self.get(&path, &[("page", page.max(1).to_string())]).await?;
        Ok(page.results)
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<TmdbListItem>, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let params = [
            ("query", query.to_string()),
            ("page", page.max(1).to_string()),
            ("include_adult", "false".to_string()),
        ];
        let page: TmdbPage<TmdbListItem> = self.get("/search/multi", &params).await?;
        Ok(page.results)
    }

    async fn movie_details(&self, id: u64) -> Result<TmdbMovieDetails, SourceError> {
        self.get(&format!("/movie/{}", id), &[]).await
    }

    async fn tv_details(&self, id: u64) -> Result<TmdbTvDetails, SourceError> {
        self.get(&format!("/tv/{}", id), &[]).await
    }

    async fn season(&self, show_id: u64, season_number: u32) -> Result<TmdbSeason, SourceError> {
        self.get(&format!("/tv/{}/season/{}", show_id, season_number), &[]).await
    }

    async fn episode_groups(&self, show_id: u64) -> Result<Vec<TmdbEpisodeGroupSummary>, SourceError> {
        let list: TmdbEpisodeGroupList = self.get(&format!("/tv/{}/episode_groups", show_id), &[]).await?;
        Ok(list.results)
    }

    async fn episode_group(&self, group_id: &str) -> Result<TmdbEpisodeGroup, SourceError> {
        let path = format!("/tv/episode_group/{}", urlencoding::encode(group_id));
        self.get(&path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str) -> TmdbConfig {
        TmdbConfig {
            api_key: api_key.to_string(),
            language: "en-US".to_string(),
            base_url: "https://api.themoviedb.org/3/".to_string(),
        }
    }

    #[test]
    fn test_new_rejects_empty_key() {
        assert!(matches!(
            TmdbClient::new(&config("  ")),
            Err(SourceError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let client = TmdbClient::new(&config("key")).unwrap();
        assert_eq!(client.url("/movie/550"), "https://api.themoviedb.org/3/movie/550");
    }

    #[tokio::test]
    async fn test_blank_search_makes_no_request() {
        let mut cfg = config("key");
        cfg.base_url = "http://127.0.0.1:9".to_string();
        let client = TmdbClient::new(&cfg).unwrap();
        assert!(client.search("   ", 1).await.unwrap().is_empty());
    }
}
