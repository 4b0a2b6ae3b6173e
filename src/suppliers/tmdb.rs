use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use futures::future::try_join_all;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use super::Supplier;
use crate::{
    cache::{CACHE_TTL_SECS, CacheManager, CachedValue},
    error::{AppError, AppResult},
    models::{Genre, Movie, SearchFilters, SupplierKind},
    transport::Transport,
};

/// Title search and cast/genre discovery against the TMDB v3 API.
pub struct TmdbSupplier {
    cache: CacheManager,
    transport: Arc<dyn Transport>,
    base_url: String,
    image_base_url: String,
    access_token: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbSupplier {
    pub fn new(
        cache: CacheManager,
        transport: Arc<dyn Transport>,
        base_url: String,
        image_base_url: String,
        access_token: String,
        rps: u32,
    ) -> Self {
        if access_token.trim().is_empty() {
            tracing::warn!("no TMDB_API_KEY provided, TMDB searches will be rejected upstream");
        }

        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { cache, transport, base_url, image_base_url, access_token, limiter }
    }

    pub fn title_key(title: &str, media_type: &str, page: u32) -> String {
        format!("tmdb:search:title:{title}:type:{media_type}:page:{page}")
    }

    /// Key of a discovery query. Only the resolved filters sent upstream take
    /// part, and `cast_ids` must already be sorted.
    pub fn discover_key(
        media_type: &str,
        cast_ids: &[u64],
        genre_id: Option<u64>,
        page: u32,
    ) -> String {
        let mut key = format!("tmdb:discover:type:{media_type}");
        if !cast_ids.is_empty() {
            key.push_str(":actors:");
            key.push_str(&join_ids(cast_ids));
        }
        if let Some(genre_id) = genre_id {
            key.push_str(&format!(":genre:{genre_id}"));
        }
        key.push_str(&format!(":page:{page}"));
        key
    }

    pub fn person_key(name: &str) -> String {
        format!("tmdb:person:name:{}", name.trim().to_lowercase())
    }

    pub fn genres_key(media_type: &str) -> String {
        format!("tmdb:type:{media_type}")
    }

    /// Resolves a person name to its TMDB id, `None` when nobody matches.
    /// Misses are cached too, as an empty scalar.
    pub async fn person_id(&self, name: &str) -> AppResult<Option<u64>> {
        let key = Self::person_key(name);
        if let Some(cached) = self.cache.get_scalar(&key).await? {
            if cached.is_empty() {
                debug!(name = %name, "person miss cache hit");
                return Ok(None);
            }
            if let Ok(id) = cached.parse::<u64>() {
                debug!(name = %name, person_id = id, "person id cache hit");
                return Ok(Some(id));
            }
        }

        let resp: PersonSearchResponse =
            decode(self.get("search/person", &[("query", name.trim().to_string())]).await?)?;
        let id = resp.results.into_iter().next().map(|p| p.id);
        if id.is_none() {
            debug!(name = %name, "no TMDB person found");
        }

        let scalar = id.map(|id| id.to_string()).unwrap_or_default();
        self.cache.set(&key, &CachedValue::Scalar(scalar), CACHE_TTL_SECS).await?;
        Ok(id)
    }

    /// Resolves every name concurrently and returns the sorted, de-duplicated
    /// ids of the names TMDB knows. Unknown names are skipped.
    pub async fn person_ids(&self, names: &[&str]) -> AppResult<Vec<u64>> {
        let resolved = try_join_all(names.iter().map(|name| self.person_id(name))).await?;
        let mut ids: Vec<u64> = resolved.into_iter().flatten().collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Genre list of a media type, sorted by name and cached as a unit.
    pub async fn type_genres(&self, media_type: &str) -> AppResult<Vec<Genre>> {
        let key = Self::genres_key(media_type);
        if let Some(genres) = self.cache.get_genres(&key).await? {
            return Ok(genres);
        }

        let resp: GenreListResponse =
            decode(self.get(&format!("genre/{media_type}/list"), &[]).await?)?;
        let mut genres = resp.genres;
        genres.sort_by(|a, b| a.name.cmp(&b.name));

        self.cache.set(&key, &CachedValue::Genres(genres.clone()), CACHE_TTL_SECS).await?;
        Ok(genres)
    }

    pub async fn genre_id(&self, name: &str, media_type: &str) -> AppResult<Option<u64>> {
        let wanted = name.trim().to_lowercase();
        let genres = self.type_genres(media_type).await?;
        Ok(genres.into_iter().find(|g| g.name.to_lowercase() == wanted).map(|g| g.id))
    }

    async fn search_by_title(
        &self,
        title: &str,
        media_type: &str,
        page: u32,
    ) -> AppResult<Vec<Movie>> {
        let key = Self::title_key(title, media_type, page);
        if let Some(movies) = self.cache.get_movies(&key).await? {
            debug!(key = %key, count = movies.len(), "tmdb cache hit");
            return Ok(movies);
        }

        debug!(title = %title, media_type, page, "searching TMDB by title");
        let params = [("query", title.to_string()), ("page", page.to_string())];
        let resp: ResultsPage = decode(self.get(&format!("search/{media_type}"), &params).await?)?;
        let movies = self.normalize(resp.results, media_type).await?;

        self.cache.set(&key, &CachedValue::Movies(movies.clone()), CACHE_TTL_SECS).await?;
        Ok(movies)
    }

    async fn discover(
        &self,
        filters: &SearchFilters,
        media_type: &str,
        page: u32,
    ) -> AppResult<Vec<Movie>> {
        let actors: Vec<&str> = filters.actors().collect();
        let cast_ids = self.person_ids(&actors).await?;
        if cast_ids.len() < actors.len() {
            debug!(actors = ?actors, resolved = cast_ids.len(), "some actors are unknown to TMDB");
        }

        let genre_id = match filters.genre() {
            Some(name) => {
                let id = self.genre_id(name, media_type).await?;
                if id.is_none() {
                    debug!(genre = %name, media_type, "unknown genre, dropping genre filter");
                }
                id
            },
            None => None,
        };

        let key = Self::discover_key(media_type, &cast_ids, genre_id, page);
        if let Some(movies) = self.cache.get_movies(&key).await? {
            debug!(key = %key, count = movies.len(), "tmdb cache hit");
            return Ok(movies);
        }

        let mut params = Vec::with_capacity(3);
        if !cast_ids.is_empty() {
            params.push(("with_cast", join_ids(&cast_ids)));
        }
        if let Some(genre_id) = genre_id {
            params.push(("with_genres", genre_id.to_string()));
        }
        params.push(("page", page.to_string()));

        debug!(key = %key, "running TMDB discovery");
        let resp: ResultsPage =
            decode(self.get(&format!("discover/{media_type}"), &params).await?)?;
        let movies = self.normalize(resp.results, media_type).await?;

        self.cache.set(&key, &CachedValue::Movies(movies.clone()), CACHE_TTL_SECS).await?;
        Ok(movies)
    }

    async fn normalize(&self, items: Vec<ResultItem>, media_type: &str) -> AppResult<Vec<Movie>> {
        let genres = if items.iter().any(|i| !i.genre_ids.is_empty()) {
            self.type_genres(media_type).await?
        } else {
            Vec::new()
        };

        items.into_iter().map(|item| item.into_movie(&genres, &self.image_base_url)).collect()
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> AppResult<Value> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let headers = [
            ("authorization", format!("Bearer {}", self.access_token)),
            ("accept", "application/json".to_string()),
        ];

        self.transport
            .get_json(&url, params, &headers)
            .await
            .map_err(|err| AppError::upstream(SupplierKind::Tmdb, err))
    }
}

#[async_trait]
impl Supplier for TmdbSupplier {
    fn kind(&self) -> SupplierKind {
        SupplierKind::Tmdb
    }

    async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<Movie>> {
        let media_type = normalize_media_type(&filters.media_type);
        let page = filters.page.max(1);

        if filters.is_discovery() {
            return self.discover(filters, media_type, page).await;
        }
        match filters.title() {
            Some(title) => self.search_by_title(title, media_type, page).await,
            None => Err(AppError::validation(
                "At least one of title, actors, or genre must be provided!",
            )),
        }
    }
}

fn normalize_media_type(media_type: &str) -> &'static str {
    match media_type.trim().to_lowercase().as_str() {
        "series" | "tv" => "tv",
        _ => "movie",
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

fn decode<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|err| AppError::protocol(SupplierKind::Tmdb, err.to_string()))
}

#[derive(Debug, Deserialize)]
struct PersonSearchResponse {
    results: Vec<PersonResult>,
}

#[derive(Debug, Deserialize)]
struct PersonResult {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct ResultsPage {
    results: Vec<ResultItem>,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u64>,
    poster_path: Option<String>,
}

impl ResultItem {
    fn into_movie(self, genres: &[Genre], image_base_url: &str) -> AppResult<Movie> {
        let id = self.id;
        let title = self.title.or(self.name).ok_or_else(|| {
            AppError::protocol(SupplierKind::Tmdb, format!("result {id} has no title or name"))
        })?;

        let year = self
            .release_date
            .filter(|d| !d.is_empty())
            .or(self.first_air_date.filter(|d| !d.is_empty()))
            .map(|d| d.chars().take(4).collect());

        let genres = self
            .genre_ids
            .iter()
            .map(|id| genres.iter().find(|g| g.id == *id).map(|g| g.name.clone()))
            .collect();

        let poster_url = self
            .poster_path
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}{}", image_base_url.trim_end_matches('/'), p));

        Ok(Movie {
            movie_id: id.to_string(),
            title,
            year,
            genres,
            poster_url,
            supplier: SupplierKind::Tmdb,
        })
    }
}
