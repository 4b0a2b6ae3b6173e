pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod routes;
pub mod service;
pub mod suppliers;
pub mod transport;

use crate::service::MovieService;

#[derive(Clone)]
pub struct AppState {
    pub movies: MovieService,
}
