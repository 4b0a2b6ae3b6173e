use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use axum_extra::extract::Query;
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    error::AppResult,
    models::{DEFAULT_MEDIA_TYPE, SearchFilters, SearchResponse},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies/search", get(search))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    title: Option<String>,
    #[serde(default = "default_media_type")]
    media_type: String,
    #[serde(default)]
    actors: Vec<String>,
    genre: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
}

fn default_media_type() -> String {
    DEFAULT_MEDIA_TYPE.to_string()
}

fn default_page() -> u32 {
    1
}

impl From<SearchQuery> for SearchFilters {
    fn from(q: SearchQuery) -> Self {
        Self {
            title: q.title,
            media_type: q.media_type,
            actors: q.actors,
            genre: q.genre,
            page: q.page,
        }
    }
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let filters = SearchFilters::from(q);
    let results = state.movies.search_movies(&filters).await?;
    Ok(Json(SearchResponse { page: filters.page, results }))
}
