use std::env;
use std::time::Duration;

use crate::discovery::location::PositionOptions;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    /// Mapbox access token; geocoding is disabled when unset
    pub mapbox_token: Option<String>,
    pub mapbox_base_url: String,
    pub location_timeout_ms: u64,
    pub location_high_accuracy: bool,
    pub default_radius_km: f64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            mapbox_token: env::var("MAPBOX_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            mapbox_base_url: env::var("MAPBOX_BASE_URL")
                .unwrap_or_else(|_| "https://api.mapbox.com".to_string()),
            location_timeout_ms: env::var("LOCATION_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .expect("LOCATION_TIMEOUT_MS must be a number of milliseconds"),
            location_high_accuracy: env::var("LOCATION_HIGH_ACCURACY")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .expect("LOCATION_HIGH_ACCURACY must be true or false"),
            default_radius_km: env::var("DEFAULT_RADIUS_KM")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .expect("DEFAULT_RADIUS_KM must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Options used for every location resolution the service performs
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            timeout: Duration::from_millis(self.location_timeout_ms),
            high_accuracy: self.location_high_accuracy,
        }
    }
}
