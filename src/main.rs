use std::{sync::Arc, time::Duration};

use reelsearch::{
    AppState,
    cache::CacheManager,
    config::Config,
    db, routes,
    service::MovieService,
    suppliers::{OmdbSupplier, TmdbSupplier},
    transport::{Transport, WreqTransport},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelsearch=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let transport: Arc<dyn Transport> =
        Arc::new(WreqTransport::with_timeout(Duration::from_secs(config.http_timeout_secs))?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    let cache = CacheManager::new(db);
    let purged = cache.purge_expired().await?;
    tracing::info!(purged, "removed expired cache entries");

    let omdb = OmdbSupplier::new(
        cache.clone(),
        transport.clone(),
        config.omdb_base_url.clone(),
        config.omdb_api_key.clone(),
    );
    let tmdb = TmdbSupplier::new(
        cache,
        transport,
        config.tmdb_base_url.clone(),
        config.tmdb_image_base_url.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_rps,
    );

    let movies = MovieService::new(Arc::new(omdb), Arc::new(tmdb));
    let state = Arc::new(AppState { movies });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
