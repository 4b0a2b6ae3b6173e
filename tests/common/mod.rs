#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reelsearch::{
    cache::CacheManager,
    db,
    error::{AppError, AppResult},
    models::{Movie, SearchFilters, SupplierKind},
    suppliers::{OmdbSupplier, Supplier, TmdbSupplier},
    transport::{Transport, TransportError},
};
use serde_json::Value;

pub const OMDB_URL: &str = "http://omdb.test/";
pub const TMDB_URL: &str = "http://tmdb.test/3";
pub const IMAGES_URL: &str = "https://image.tmdb.org/t/p/w500";

pub async fn memory_cache() -> CacheManager {
    CacheManager::new(db::connect_and_migrate("sqlite::memory:").await.unwrap())
}

#[derive(Clone, Debug)]
pub struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

struct Route {
    path: String,
    param: Option<(String, String)>,
    response: Result<Value, TransportError>,
}

/// Transport answering from a table of canned responses and recording every
/// request it sees.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<Call>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers requests whose URL ends with `path`.
    pub fn on(&self, path: &str, response: Result<Value, TransportError>) -> &Self {
        self.routes.lock().unwrap().push(Route { path: path.to_string(), param: None, response });
        self
    }

    /// Answers requests whose URL ends with `path` and carry `name=value`.
    pub fn on_param(
        &self,
        path: &str,
        name: &str,
        value: &str,
        response: Result<Value, TransportError>,
    ) -> &Self {
        self.routes.lock().unwrap().push(Route {
            path: path.to_string(),
            param: Some((name.to_string(), value.to_string())),
            response,
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.url.ends_with(path)).collect()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<Value, TransportError> {
        let call = Call {
            url: url.to_string(),
            params: params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        };

        let response = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                url.ends_with(&r.path)
                    && r.param.as_ref().is_none_or(|(k, v)| call.param(k) == Some(v.as_str()))
            })
            .map(|r| r.response.clone())
            .unwrap_or_else(|| {
                Err(TransportError::Status { status: 404, body: format!("no stub for {url}") })
            });

        self.calls.lock().unwrap().push(call);
        response
    }
}

pub fn omdb(cache: CacheManager, transport: Arc<StubTransport>) -> OmdbSupplier {
    OmdbSupplier::new(cache, transport, OMDB_URL.to_string(), "omdb-key".to_string())
}

pub fn tmdb(cache: CacheManager, transport: Arc<StubTransport>) -> TmdbSupplier {
    TmdbSupplier::new(
        cache,
        transport,
        TMDB_URL.to_string(),
        IMAGES_URL.to_string(),
        "tmdb-token".to_string(),
        1_000,
    )
}

pub fn movie(id: &str, supplier: SupplierKind) -> Movie {
    Movie {
        movie_id: id.to_string(),
        title: format!("Movie {id}"),
        year: Some("2002".to_string()),
        genres: Vec::new(),
        poster_url: None,
        supplier,
    }
}

/// Supplier returning a scripted outcome and recording the filters it got.
pub struct StubSupplier {
    kind: SupplierKind,
    outcome: Box<dyn Fn() -> AppResult<Vec<Movie>> + Send + Sync>,
    seen: Mutex<Vec<SearchFilters>>,
}

impl StubSupplier {
    pub fn ok(kind: SupplierKind, movies: Vec<Movie>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            outcome: Box::new(move || Ok(movies.clone())),
            seen: Mutex::default(),
        })
    }

    pub fn failing(kind: SupplierKind, make: fn(SupplierKind) -> AppError) -> Arc<Self> {
        Arc::new(Self { kind, outcome: Box::new(move || Err(make(kind))), seen: Mutex::default() })
    }

    pub fn seen(&self) -> Vec<SearchFilters> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Supplier for StubSupplier {
    fn kind(&self) -> SupplierKind {
        self.kind
    }

    async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<Movie>> {
        self.seen.lock().unwrap().push(filters.clone());
        (self.outcome)()
    }
}

pub fn client_error(supplier: SupplierKind) -> AppError {
    AppError::UpstreamClient { supplier, status: Some(401), message: "Invalid API key!".into() }
}

pub fn timeout(supplier: SupplierKind) -> AppError {
    AppError::UpstreamTimeout { supplier }
}

pub fn storage_fault(_: SupplierKind) -> AppError {
    AppError::Cache(sea_orm::DbErr::Custom("database is locked".into()))
}
