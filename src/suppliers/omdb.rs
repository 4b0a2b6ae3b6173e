use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::Supplier;
use crate::{
    cache::{CACHE_TTL_SECS, CacheManager, CachedValue},
    error::{AppError, AppResult},
    models::{Movie, SearchFilters, SupplierKind},
    transport::Transport,
};

/// OMDB's way of saying a search had zero matches.
const NOT_FOUND_MESSAGE: &str = "Movie not found!";

/// Title-only search against the OMDB API.
pub struct OmdbSupplier {
    cache: CacheManager,
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: String,
}

impl OmdbSupplier {
    pub fn new(
        cache: CacheManager,
        transport: Arc<dyn Transport>,
        base_url: String,
        api_key: String,
    ) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no OMDB_API_KEY provided, OMDB searches will be rejected upstream");
        }
        Self { cache, transport, base_url, api_key }
    }

    pub fn search_key(title: &str, media_type: &str, page: u32) -> String {
        format!("omdb:search:title:{title}:type:{media_type}:page:{page}")
    }

    async fn fetch(&self, title: &str, media_type: &str, page: u32) -> AppResult<Vec<Movie>> {
        let params = [
            ("apikey", self.api_key.clone()),
            ("s", title.to_string()),
            ("type", media_type.to_string()),
            ("page", page.to_string()),
        ];

        let body = self
            .transport
            .get_json(&self.base_url, &params, &[])
            .await
            .map_err(|err| AppError::upstream(SupplierKind::Omdb, err))?;

        let resp: SearchResponse = serde_json::from_value(body)
            .map_err(|err| AppError::protocol(SupplierKind::Omdb, err.to_string()))?;

        parse_search(resp)
    }
}

#[async_trait]
impl Supplier for OmdbSupplier {
    fn kind(&self) -> SupplierKind {
        SupplierKind::Omdb
    }

    async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<Movie>> {
        let Some(title) = filters.title() else {
            return Err(AppError::validation("The title is a required field!"));
        };
        let media_type = normalize_media_type(&filters.media_type);
        let page = filters.page.max(1);

        let key = Self::search_key(title, media_type, page);
        if let Some(movies) = self.cache.get_movies(&key).await? {
            debug!(key = %key, count = movies.len(), "omdb cache hit");
            return Ok(movies);
        }

        debug!(title = %title, media_type, page, "searching OMDB");
        let movies = self.fetch(title, media_type, page).await?;

        self.cache.set(&key, &CachedValue::Movies(movies.clone()), CACHE_TTL_SECS).await?;
        Ok(movies)
    }
}

fn normalize_media_type(media_type: &str) -> &'static str {
    if media_type.trim().eq_ignore_ascii_case("series") { "series" } else { "movie" }
}

fn parse_search(resp: SearchResponse) -> AppResult<Vec<Movie>> {
    if resp.response.eq_ignore_ascii_case("true") {
        let items = resp.search.ok_or_else(|| {
            AppError::protocol(SupplierKind::Omdb, "successful response without a Search list")
        })?;
        return Ok(items.into_iter().map(SearchItem::into_movie).collect());
    }

    match resp.error {
        Some(message) if message == NOT_FOUND_MESSAGE => Ok(Vec::new()),
        Some(message) => {
            Err(AppError::UpstreamClient { supplier: SupplierKind::Omdb, status: None, message })
        },
        None => Err(AppError::protocol(SupplierKind::Omdb, "failed response without an Error")),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Search")]
    search: Option<Vec<SearchItem>>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

impl SearchItem {
    fn into_movie(self) -> Movie {
        Movie {
            movie_id: self.imdb_id,
            title: self.title,
            year: self.year.filter(|y| !y.is_empty() && y != "N/A"),
            // the search endpoint carries no genre data
            genres: Vec::new(),
            poster_url: self.poster.filter(|p| !p.is_empty() && p != "N/A"),
            supplier: SupplierKind::Omdb,
        }
    }
}
