//! Upstream movie suppliers behind one search contract.

mod omdb;
mod tmdb;

use async_trait::async_trait;

pub use omdb::OmdbSupplier;
pub use tmdb::TmdbSupplier;

use crate::{
    error::AppResult,
    models::{Movie, SearchFilters, SupplierKind},
};

/// A provider able to answer a movie search with normalized records.
///
/// Implementations validate their own minimum input, read through the cache
/// before going upstream and cache what they return.
#[async_trait]
pub trait Supplier: Send + Sync {
    fn kind(&self) -> SupplierKind;

    async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<Movie>>;
}
