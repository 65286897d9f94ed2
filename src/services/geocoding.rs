use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::discovery::location::{Location, ReverseGeocoder};
use crate::utils::geo::Coordinate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const SEARCH_TYPES: &str = "address,place,poi";

#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid geocoding url: {0}")]
    InvalidUrl(String),
}

/// Client for the Mapbox Geocoding v5 `mapbox.places` endpoint
#[derive(Clone)]
pub struct MapboxGeocoder {
    client: Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    place_name: String,
    /// `[lng, lat]`
    center: Option<[f64; 2]>,
}

impl Feature {
    fn into_location(self) -> Option<Location> {
        let [lng, lat] = self.center?;
        let coordinate = Coordinate::new(lat, lng).ok()?;
        Some(Location::new(coordinate, Some(self.place_name)))
    }
}

impl MapboxGeocoder {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, GeocodingError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        })
    }

    /// `{base}/geocoding/v5/mapbox.places/{search}.json?access_token=...`
    fn places_url(&self, search: &str) -> Result<Url, GeocodingError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| GeocodingError::InvalidUrl(e.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| GeocodingError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", format!("{search}.json").as_str()]);

        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token);

        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<PlacesResponse, GeocodingError> {
        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<PlacesResponse>()
            .await?;

        Ok(response)
    }

    /// Candidate places for free text, best match first
    pub async fn forward_geocode(&self, query: &str) -> Result<Vec<Location>, GeocodingError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = self.places_url(query)?;
        url.query_pairs_mut().append_pair("types", SEARCH_TYPES);

        let response = self.fetch(url).await?;
        tracing::debug!(query = %query, results = response.features.len(), "Forward geocoded");

        Ok(response
            .features
            .into_iter()
            .filter_map(Feature::into_location)
            .collect())
    }
}

#[async_trait]
impl ReverseGeocoder for MapboxGeocoder {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodingError> {
        let url = self.places_url(&format!("{},{}", coordinate.lng, coordinate.lat))?;
        let response = self.fetch(url).await?;

        Ok(response.features.into_iter().next().map(|f| f.place_name))
    }
}
