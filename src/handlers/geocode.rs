use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::discovery::location::{Location, LocationResolver, ReportedPosition};
use crate::error::{AppError, AppResult};
use crate::utils::geo::Coordinate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Address autocomplete. Lookup failures degrade to no suggestions.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Location>> {
    let Some(geocoder) = state.geocoder.as_ref() else {
        return Json(Vec::new());
    };

    match geocoder.forward_geocode(&query.q).await {
        Ok(places) => Json(places),
        Err(e) => {
            tracing::warn!(error = %e, "Address search failed");
            Json(Vec::new())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lng: f64,
}

/// Address for a coordinate, `Unknown location` when it can't be found
pub async fn reverse(
    State(state): State<AppState>,
    Query(query): Query<ReverseQuery>,
) -> AppResult<Json<Location>> {
    let position = ReportedPosition::Known(Coordinate::new(query.lat, query.lng)?);

    let mut location = LocationResolver::new(Some(&position))
        .with_geocoder(state.reverse_geocoder())
        .resolve_current_location(&state.config.position_options())
        .await
        .map_err(|e| AppError::Internal(format!("Failed to resolve location: {}", e)))?;

    if location.address.is_none() {
        location.address = Some(location.address_or_unknown().to_string());
    }

    Ok(Json(location))
}
