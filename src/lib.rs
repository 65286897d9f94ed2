pub mod config;
pub mod db;
pub mod discovery;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use sea_orm::DatabaseConnection;

use discovery::location::ReverseGeocoder;
use services::chat::ChatHub;
use services::geocoding::MapboxGeocoder;

pub use config::Config;
pub use error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub chat: ChatHub,
    /// `None` when no Mapbox token is configured
    pub geocoder: Option<MapboxGeocoder>,
}

impl AppState {
    pub fn reverse_geocoder(&self) -> Option<&dyn ReverseGeocoder> {
        self.geocoder.as_ref().map(|g| g as &dyn ReverseGeocoder)
    }
}
