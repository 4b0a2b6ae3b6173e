use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    models::{Movie, SearchFilters},
    suppliers::Supplier,
};

/// Routes a search to the supplier able to answer it.
///
/// Discovery (actors/genre) goes to TMDB only. A title-only search asks OMDB
/// first and falls back to TMDB exactly once if OMDB fails upstream. Local
/// storage faults surface as-is.
#[derive(Clone)]
pub struct MovieService {
    omdb: Arc<dyn Supplier>,
    tmdb: Arc<dyn Supplier>,
}

impl MovieService {
    pub fn new(omdb: Arc<dyn Supplier>, tmdb: Arc<dyn Supplier>) -> Self {
        Self { omdb, tmdb }
    }

    pub async fn search_movies(&self, filters: &SearchFilters) -> AppResult<Vec<Movie>> {
        validate(filters)?;

        if filters.is_discovery() {
            debug!(supplier = %self.tmdb.kind(), "discovery search");
            return self.tmdb.search(filters).await;
        }

        match self.omdb.search(filters).await {
            Ok(movies) => Ok(movies),
            Err(err) if err.is_internal() => Err(err),
            Err(err) => {
                warn!(
                    supplier = %self.omdb.kind(),
                    fallback = %self.tmdb.kind(),
                    error = %err,
                    "title search failed, falling back"
                );
                self.tmdb.search(filters).await
            },
        }
    }
}

fn validate(filters: &SearchFilters) -> AppResult<()> {
    let has_title = filters.title().is_some();

    if !has_title && !filters.is_discovery() {
        return Err(AppError::validation("Provide at least one of title, actors, or genre."));
    }
    if has_title && filters.is_discovery() {
        return Err(AppError::validation(
            "Provide only title or any other filters without title.",
        ));
    }
    if filters.page == 0 {
        return Err(AppError::validation("page must be a positive integer"));
    }
    Ok(())
}
