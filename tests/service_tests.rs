mod common;

use std::sync::Arc;

use common::{
    StubSupplier, StubTransport, client_error, memory_cache, movie, storage_fault, timeout,
};
use reelsearch::{
    error::AppError,
    models::{SearchFilters, SupplierKind},
    service::MovieService,
    transport::TransportError,
};
use serde_json::json;

#[tokio::test]
async fn title_with_cast_and_genre_is_rejected_before_dispatch() {
    let omdb = StubSupplier::ok(SupplierKind::Omdb, vec![]);
    let tmdb = StubSupplier::ok(SupplierKind::Tmdb, vec![]);
    let service = MovieService::new(omdb.clone(), tmdb.clone());

    let filters =
        SearchFilters::by_title("Inception").with_actors(["Leonardo"]).with_genre("Sci-Fi");
    let err = service.search_movies(&filters).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(omdb.seen().is_empty());
    assert!(tmdb.seen().is_empty());
}

#[tokio::test]
async fn empty_request_is_rejected() {
    let omdb = StubSupplier::ok(SupplierKind::Omdb, vec![]);
    let tmdb = StubSupplier::ok(SupplierKind::Tmdb, vec![]);
    let service = MovieService::new(omdb.clone(), tmdb.clone());

    let err = service.search_movies(&SearchFilters::default()).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(omdb.seen().is_empty() && tmdb.seen().is_empty());
}

#[tokio::test]
async fn discovery_goes_to_tmdb_only() {
    let omdb = StubSupplier::ok(SupplierKind::Omdb, vec![movie("tt1", SupplierKind::Omdb)]);
    let tmdb = StubSupplier::ok(SupplierKind::Tmdb, vec![movie("500", SupplierKind::Tmdb)]);
    let service = MovieService::new(omdb.clone(), tmdb.clone());

    let filters = SearchFilters::default().with_actors(["Tom Cruise"]).with_genre("Action");
    let movies = service.search_movies(&filters).await.unwrap();

    assert_eq!(movies, vec![movie("500", SupplierKind::Tmdb)]);
    assert!(omdb.seen().is_empty());
    assert_eq!(tmdb.seen(), vec![filters]);
}

#[tokio::test]
async fn discovery_failure_does_not_fall_back() {
    let omdb = StubSupplier::ok(SupplierKind::Omdb, vec![movie("tt1", SupplierKind::Omdb)]);
    let tmdb = StubSupplier::failing(SupplierKind::Tmdb, timeout);
    let service = MovieService::new(omdb.clone(), tmdb);

    let filters = SearchFilters::default().with_genre("Drama");
    let err = service.search_movies(&filters).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamTimeout { supplier: SupplierKind::Tmdb }));
    assert!(omdb.seen().is_empty());
}

#[tokio::test]
async fn title_search_prefers_omdb() {
    let omdb = StubSupplier::ok(SupplierKind::Omdb, vec![movie("tt1", SupplierKind::Omdb)]);
    let tmdb = StubSupplier::ok(SupplierKind::Tmdb, vec![movie("500", SupplierKind::Tmdb)]);
    let service = MovieService::new(omdb.clone(), tmdb.clone());

    let movies = service.search_movies(&SearchFilters::by_title("gang")).await.unwrap();

    assert_eq!(movies[0].supplier, SupplierKind::Omdb);
    assert!(tmdb.seen().is_empty());
}

#[tokio::test]
async fn omdb_empty_result_is_not_a_failure() {
    let omdb = StubSupplier::ok(SupplierKind::Omdb, vec![]);
    let tmdb = StubSupplier::ok(SupplierKind::Tmdb, vec![movie("500", SupplierKind::Tmdb)]);
    let service = MovieService::new(omdb, tmdb.clone());

    let movies = service.search_movies(&SearchFilters::by_title("zzzzqqq")).await.unwrap();

    assert!(movies.is_empty());
    assert!(tmdb.seen().is_empty());
}

#[tokio::test]
async fn omdb_failure_falls_back_to_tmdb_with_same_filters() {
    let omdb = StubSupplier::failing(SupplierKind::Omdb, client_error);
    let tmdb = StubSupplier::ok(SupplierKind::Tmdb, vec![movie("3131", SupplierKind::Tmdb)]);
    let service = MovieService::new(omdb.clone(), tmdb.clone());

    let filters = SearchFilters::by_title("gang").with_media_type("series").with_page(2);
    let movies = service.search_movies(&filters).await.unwrap();

    assert_eq!(movies, vec![movie("3131", SupplierKind::Tmdb)]);
    assert_eq!(omdb.seen(), vec![filters.clone()]);
    assert_eq!(tmdb.seen(), vec![filters]);
}

#[tokio::test]
async fn fallback_failure_surfaces_and_is_not_retried() {
    let omdb = StubSupplier::failing(SupplierKind::Omdb, client_error);
    let tmdb = StubSupplier::failing(SupplierKind::Tmdb, timeout);
    let service = MovieService::new(omdb.clone(), tmdb.clone());

    let err = service.search_movies(&SearchFilters::by_title("gang")).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamTimeout { supplier: SupplierKind::Tmdb }));
    assert_eq!(omdb.seen().len(), 1);
    assert_eq!(tmdb.seen().len(), 1);
}

#[tokio::test]
async fn omdb_storage_fault_surfaces_without_fallback() {
    let omdb = StubSupplier::failing(SupplierKind::Omdb, storage_fault);
    let tmdb = StubSupplier::ok(SupplierKind::Tmdb, vec![movie("3131", SupplierKind::Tmdb)]);
    let service = MovieService::new(omdb.clone(), tmdb.clone());

    let err = service.search_movies(&SearchFilters::by_title("gang")).await.unwrap_err();

    assert!(matches!(err, AppError::Cache(_)));
    assert_eq!(omdb.seen().len(), 1);
    assert!(tmdb.seen().is_empty());
}

#[tokio::test]
async fn fallback_runs_against_real_suppliers() {
    let cache = memory_cache().await;
    let transport = StubTransport::new();
    transport
        .on(
            common::OMDB_URL,
            Err(TransportError::Status { status: 401, body: "Invalid API key!".into() }),
        )
        .on(
            "/search/movie",
            Ok(json!({"results": [{"id": 3131, "title": "Gangs of New York",
                                   "release_date": "2002-12-14"}]})),
        );
    let omdb = common::omdb(cache.clone(), transport.clone());
    let tmdb = common::tmdb(cache, transport.clone());
    let service = MovieService::new(Arc::new(omdb), Arc::new(tmdb));

    let movies = service.search_movies(&SearchFilters::by_title("gang")).await.unwrap();

    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].movie_id, "3131");
    assert_eq!(movies[0].supplier, SupplierKind::Tmdb);

    let tmdb_call = &transport.calls_to("/search/movie")[0];
    assert_eq!(tmdb_call.param("query"), Some("gang"));
    assert_eq!(tmdb_call.param("page"), Some("1"));
}
