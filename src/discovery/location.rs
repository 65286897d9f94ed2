use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::services::geocoding::GeocodingError;
use crate::utils::geo::{Coordinate, CoordinateError};

/// Address used when reverse geocoding fails or finds nothing
pub const UNKNOWN_ADDRESS: &str = "Unknown location";

/// A resolved position, optionally with a human-readable address.
/// Created per request and never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub address: Option<String>,
}

impl Location {
    pub fn new(coordinate: Coordinate, address: Option<String>) -> Self {
        Self { coordinate, address }
    }

    pub fn address_or_unknown(&self) -> &str {
        self.address.as_deref().unwrap_or(UNKNOWN_ADDRESS)
    }
}

#[derive(Debug, Clone)]
pub struct PositionOptions {
    pub timeout: Duration,
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            high_accuracy: true,
        }
    }
}

/// Failure codes a position source can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Please enable location access in your browser settings")]
    PermissionDenied,
    #[error("Location information is unavailable")]
    Unavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Geolocation is not supported")]
    Unsupported,
}

impl From<PositionError> for LocationError {
    fn from(e: PositionError) -> Self {
        match e {
            PositionError::PermissionDenied => LocationError::PermissionDenied,
            PositionError::PositionUnavailable => LocationError::Unavailable,
            PositionError::Timeout => LocationError::Timeout,
        }
    }
}

/// Where the caller's current coordinates come from
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinate, PositionError>;
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Best match for the coordinate, `None` when nothing matched
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodingError>;
}

/// The position a client reported alongside its request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportedPosition {
    Known(Coordinate),
    /// The client says the user refused the permission prompt
    Denied,
    Missing,
}

impl ReportedPosition {
    /// A position is only known when both halves were sent
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>, denied: bool) -> Result<Self, CoordinateError> {
        if denied {
            return Ok(ReportedPosition::Denied);
        }

        match (lat, lng) {
            (Some(lat), Some(lng)) => Ok(ReportedPosition::Known(Coordinate::new(lat, lng)?)),
            _ => Ok(ReportedPosition::Missing),
        }
    }
}

#[async_trait]
impl PositionSource for ReportedPosition {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Coordinate, PositionError> {
        match self {
            ReportedPosition::Known(coordinate) => Ok(*coordinate),
            ReportedPosition::Denied => Err(PositionError::PermissionDenied),
            ReportedPosition::Missing => Err(PositionError::PositionUnavailable),
        }
    }
}

/// Resolves the caller's location: one position request bounded by a timeout,
/// then a best-effort reverse geocode. Nothing is retried.
pub struct LocationResolver<'a> {
    source: Option<&'a dyn PositionSource>,
    geocoder: Option<&'a dyn ReverseGeocoder>,
}

impl<'a> LocationResolver<'a> {
    /// `None` means the platform has no location capability at all
    pub fn new(source: Option<&'a dyn PositionSource>) -> Self {
        Self {
            source,
            geocoder: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Option<&'a dyn ReverseGeocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub async fn resolve_current_location(
        &self,
        options: &PositionOptions,
    ) -> Result<Location, LocationError> {
        let source = self.source.ok_or(LocationError::Unsupported)?;

        let coordinate = match tokio::time::timeout(options.timeout, source.current_position(options)).await {
            Ok(Ok(coordinate)) => coordinate,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::debug!(timeout_ms = options.timeout.as_millis() as u64, "Position request timed out");
                return Err(LocationError::Timeout);
            }
        };

        // A source handing back garbage is treated like one that found nothing
        let coordinate = Coordinate::new(coordinate.lat, coordinate.lng).map_err(|e| {
            tracing::warn!(error = %e, "Position source returned an invalid coordinate");
            LocationError::Unavailable
        })?;

        let address = match self.geocoder {
            Some(geocoder) => Some(lookup_address(geocoder, coordinate).await),
            None => None,
        };

        Ok(Location::new(coordinate, address))
    }
}

async fn lookup_address(geocoder: &dyn ReverseGeocoder, coordinate: Coordinate) -> String {
    match geocoder.reverse_geocode(coordinate).await {
        Ok(Some(address)) => address,
        Ok(None) => UNKNOWN_ADDRESS.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, lat = coordinate.lat, lng = coordinate.lng, "Reverse geocoding failed");
            UNKNOWN_ADDRESS.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const LONDON: Coordinate = Coordinate { lat: 51.5074, lng: -0.1278 };

    struct FixedSource(Result<Coordinate, PositionError>);

    #[async_trait]
    impl PositionSource for FixedSource {
        async fn current_position(&self, _options: &PositionOptions) -> Result<Coordinate, PositionError> {
            self.0
        }
    }

    struct SlowSource;

    #[async_trait]
    impl PositionSource for SlowSource {
        async fn current_position(&self, _options: &PositionOptions) -> Result<Coordinate, PositionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(LONDON)
        }
    }

    #[derive(Default)]
    struct RecordingSource {
        high_accuracy: Mutex<Option<bool>>,
    }

    #[async_trait]
    impl PositionSource for RecordingSource {
        async fn current_position(&self, options: &PositionOptions) -> Result<Coordinate, PositionError> {
            *self.high_accuracy.lock().unwrap() = Some(options.high_accuracy);
            Ok(LONDON)
        }
    }

    struct FixedGeocoder(Option<&'static str>);

    #[async_trait]
    impl ReverseGeocoder for FixedGeocoder {
        async fn reverse_geocode(&self, _coordinate: Coordinate) -> Result<Option<String>, GeocodingError> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct FailingGeocoder;

    #[async_trait]
    impl ReverseGeocoder for FailingGeocoder {
        async fn reverse_geocode(&self, _coordinate: Coordinate) -> Result<Option<String>, GeocodingError> {
            Err(GeocodingError::InvalidUrl("unreachable".to_string()))
        }
    }

    fn quick() -> PositionOptions {
        PositionOptions {
            timeout: Duration::from_millis(50),
            high_accuracy: false,
        }
    }

    #[tokio::test]
    async fn test_no_source_is_unsupported() {
        let resolver = LocationResolver::new(None);
        assert_eq!(
            resolver.resolve_current_location(&quick()).await,
            Err(LocationError::Unsupported)
        );
    }

    #[tokio::test]
    async fn test_source_errors_are_mapped() {
        let cases = [
            (PositionError::PermissionDenied, LocationError::PermissionDenied),
            (PositionError::PositionUnavailable, LocationError::Unavailable),
            (PositionError::Timeout, LocationError::Timeout),
        ];

        for (source_error, expected) in cases {
            let source = FixedSource(Err(source_error));
            let resolver = LocationResolver::new(Some(&source));
            assert_eq!(resolver.resolve_current_location(&quick()).await, Err(expected));
        }
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let source = SlowSource;
        let resolver = LocationResolver::new(Some(&source));
        assert_eq!(
            resolver.resolve_current_location(&quick()).await,
            Err(LocationError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_options_reach_the_source() {
        let source = RecordingSource::default();
        let resolver = LocationResolver::new(Some(&source));
        let options = PositionOptions {
            high_accuracy: true,
            ..quick()
        };

        resolver.resolve_current_location(&options).await.unwrap();
        assert_eq!(*source.high_accuracy.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_without_geocoder_address_is_absent() {
        let source = FixedSource(Ok(LONDON));
        let location = LocationResolver::new(Some(&source))
            .resolve_current_location(&quick())
            .await
            .unwrap();

        assert_eq!(location, Location::new(LONDON, None));
        assert_eq!(location.address_or_unknown(), UNKNOWN_ADDRESS);
    }

    #[tokio::test]
    async fn test_geocoder_address_is_attached() {
        let source = FixedSource(Ok(LONDON));
        let geocoder = FixedGeocoder(Some("Westminster, London"));
        let location = LocationResolver::new(Some(&source))
            .with_geocoder(Some(&geocoder))
            .resolve_current_location(&quick())
            .await
            .unwrap();

        assert_eq!(location.address.as_deref(), Some("Westminster, London"));
    }

    #[tokio::test]
    async fn test_geocoder_failure_falls_back_to_placeholder() {
        let source = FixedSource(Ok(LONDON));

        for geocoder in [&FailingGeocoder as &dyn ReverseGeocoder, &FixedGeocoder(None)] {
            let location = LocationResolver::new(Some(&source))
                .with_geocoder(Some(geocoder))
                .resolve_current_location(&quick())
                .await
                .unwrap();

            assert_eq!(location.coordinate, LONDON);
            assert_eq!(location.address.as_deref(), Some(UNKNOWN_ADDRESS));
        }
    }

    #[tokio::test]
    async fn test_invalid_coordinate_from_source_is_unavailable() {
        let source = FixedSource(Ok(Coordinate { lat: 123.0, lng: 0.0 }));
        let resolver = LocationResolver::new(Some(&source));
        assert_eq!(
            resolver.resolve_current_location(&quick()).await,
            Err(LocationError::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_reported_position() {
        let options = quick();
        assert_eq!(
            ReportedPosition::from_parts(Some(1.0), Some(2.0), false)
                .unwrap()
                .current_position(&options)
                .await,
            Ok(Coordinate { lat: 1.0, lng: 2.0 })
        );
        assert_eq!(
            ReportedPosition::from_parts(Some(1.0), None, false).unwrap(),
            ReportedPosition::Missing
        );
        assert_eq!(
            ReportedPosition::from_parts(Some(1.0), Some(2.0), true)
                .unwrap()
                .current_position(&options)
                .await,
            Err(PositionError::PermissionDenied)
        );
        assert!(ReportedPosition::from_parts(Some(95.0), Some(2.0), false).is_err());
    }

    #[test]
    fn test_location_json_shape() {
        let location = Location::new(LONDON, Some("London".to_string()));
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "lat": 51.5074, "lng": -0.1278, "address": "London" })
        );
    }
}
