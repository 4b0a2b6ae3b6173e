use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::warn;

use crate::{
    entities::cache_entry,
    error::AppResult,
    models::{Genre, Movie},
};

/// Lifetime of every cached entry.
pub const CACHE_TTL_SECS: i64 = 86_400;

/// A cached value together with its kind, so readers decode at the call site
/// instead of guessing the shape of the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CachedValue {
    Scalar(String),
    Genres(Vec<Genre>),
    Movies(Vec<Movie>),
}

impl CachedValue {
    fn kind(&self) -> &'static str {
        match self {
            CachedValue::Scalar(_) => "scalar",
            CachedValue::Genres(_) => "genres",
            CachedValue::Movies(_) => "movies",
        }
    }

    fn encode(&self) -> serde_json::Result<String> {
        match self {
            CachedValue::Scalar(value) => serde_json::to_string(value),
            CachedValue::Genres(genres) => serde_json::to_string(genres),
            CachedValue::Movies(movies) => serde_json::to_string(movies),
        }
    }

    fn decode(kind: &str, payload: &str) -> Result<Self, String> {
        let decoded = match kind {
            "scalar" => serde_json::from_str(payload).map(CachedValue::Scalar),
            "genres" => serde_json::from_str(payload).map(CachedValue::Genres),
            "movies" => serde_json::from_str(payload).map(CachedValue::Movies),
            other => return Err(format!("unknown cache value kind {other:?}")),
        };
        decoded.map_err(|err| err.to_string())
    }
}

/// TTL key/value store shared by all suppliers.
#[derive(Clone)]
pub struct CacheManager {
    db: DatabaseConnection,
}

impl CacheManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the live value under `key`, or `None` when it is missing,
    /// expired or unreadable.
    pub async fn get(&self, key: &str) -> AppResult<Option<CachedValue>> {
        let entry = cache_entry::Entity::find_by_id(key.to_string()).one(&self.db).await?;
        let Some(entry) = entry.filter(|e| e.expires_at > now_sec()) else {
            return Ok(None);
        };

        match CachedValue::decode(&entry.kind, &entry.value) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key = %key, error = %err, "discarding undecodable cache entry");
                Ok(None)
            },
        }
    }

    pub async fn set(&self, key: &str, value: &CachedValue, ttl_secs: i64) -> AppResult<()> {
        let model = cache_entry::ActiveModel {
            cache_key: Set(key.to_string()),
            kind: Set(value.kind().to_string()),
            value: Set(value.encode()?),
            expires_at: Set(now_sec().saturating_add(ttl_secs)),
        };

        cache_entry::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(cache_entry::Column::CacheKey)
                    .update_columns([
                        cache_entry::Column::Kind,
                        cache_entry::Column::Value,
                        cache_entry::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    pub async fn get_scalar(&self, key: &str) -> AppResult<Option<String>> {
        Ok(match self.get(key).await? {
            Some(CachedValue::Scalar(value)) => Some(value),
            other => mismatch(key, other, "scalar"),
        })
    }

    pub async fn get_genres(&self, key: &str) -> AppResult<Option<Vec<Genre>>> {
        Ok(match self.get(key).await? {
            Some(CachedValue::Genres(genres)) => Some(genres),
            other => mismatch(key, other, "genres"),
        })
    }

    pub async fn get_movies(&self, key: &str) -> AppResult<Option<Vec<Movie>>> {
        Ok(match self.get(key).await? {
            Some(CachedValue::Movies(movies)) => Some(movies),
            other => mismatch(key, other, "movies"),
        })
    }

    /// Physically removes expired rows. Readers already ignore them.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let res = cache_entry::Entity::delete_many()
            .filter(cache_entry::Column::ExpiresAt.lte(now_sec()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

fn mismatch<T>(key: &str, found: Option<CachedValue>, expected: &str) -> Option<T> {
    if let Some(found) = found {
        warn!(key = %key, expected, found = found.kind(), "cache value kind mismatch");
    }
    None
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
