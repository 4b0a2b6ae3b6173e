use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub database_url: String,
    pub tmdb_rps: u32,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let omdb_api_key = std::env::var("OMDB_API_KEY").unwrap_or_default();
        let omdb_base_url = std::env::var("OMDB_BASE_URL")
            .unwrap_or_else(|_| "https://www.omdbapi.com/".to_string());

        let tmdb_api_key = std::env::var("TMDB_API_KEY").unwrap_or_default();
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_image_base_url = std::env::var("TMDB_IMAGE_BASE_URL")
            .unwrap_or_else(|_| "https://image.tmdb.org/t/p/w500".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelsearch.db?mode=rwc".to_string());

        let tmdb_rps: u32 =
            std::env::var("TMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let http_timeout_secs: u64 =
            std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            omdb_api_key,
            omdb_base_url,
            tmdb_api_key,
            tmdb_base_url,
            tmdb_image_base_url,
            database_url,
            tmdb_rps,
            http_timeout_secs,
        })
    }
}
