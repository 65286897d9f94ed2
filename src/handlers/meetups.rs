use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discovery::location::{Location, LocationResolver, ReportedPosition};
use crate::discovery::proximity::filter_by_radius;
use crate::entities::{meetup, participant};
use crate::error::{AppError, AppResult};
use crate::utils::geo::{distance_km, Coordinate, HasCoordinate};
use crate::utils::jwt::Claims;
use crate::utils::limits::{check_length, MAX_ADDRESS_LEN, MAX_CATEGORY_LEN, MAX_TITLE_LEN};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MeetupResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub time: DateTime<Utc>,
    pub max_participants: i32,
    pub category: String,
    pub requirements: String,
    pub creator_id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Utc>,
    /// Only present when the caller's location is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl MeetupResponse {
    fn from_model(m: meetup::Model, distance_km: Option<f64>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            location: m.location,
            time: m.time.with_timezone(&Utc),
            max_participants: m.max_participants,
            category: m.category,
            requirements: m.requirements,
            creator_id: m.creator_id,
            lat: m.lat,
            lng: m.lng,
            created_at: m.created_at.with_timezone(&Utc),
            distance_km,
        }
    }
}

/// List every meetup
pub async fn list_meetups(State(state): State<AppState>) -> AppResult<Json<Vec<MeetupResponse>>> {
    let meetups = meetup::Entity::find()
        .order_by_asc(meetup::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(
        meetups
            .into_iter()
            .map(|m| MeetupResponse::from_model(m, None))
            .collect(),
    ))
}

// ============ Discovery ============

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    /// Set by clients whose user refused the location prompt
    #[serde(default)]
    pub denied: bool,
}

#[derive(Debug, Serialize)]
pub struct NearbyMeetupsResponse {
    pub origin: Option<Location>,
    pub radius_km: f64,
    /// Why no origin was used, when there is none
    pub location_error: Option<String>,
    pub meetups: Vec<MeetupResponse>,
}

/// Meetups near the caller. Without a usable location every meetup is returned.
pub async fn nearby_meetups(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> AppResult<Json<NearbyMeetupsResponse>> {
    let radius_km = query.radius_km.unwrap_or(state.config.default_radius_km);
    if radius_km.is_nan() || radius_km < 0.0 {
        return Err(AppError::BadRequest("radius_km must be a non-negative number".to_string()));
    }

    let position = ReportedPosition::from_parts(query.lat, query.lng, query.denied)?;
    let resolver = LocationResolver::new(Some(&position)).with_geocoder(state.reverse_geocoder());

    let (origin, location_error) = match resolver
        .resolve_current_location(&state.config.position_options())
        .await
    {
        Ok(location) => (Some(location), None),
        Err(e) => {
            tracing::debug!(error = %e, "Discovering meetups without a location");
            (None, Some(e.to_string()))
        }
    };

    let meetups = meetup::Entity::find()
        .order_by_asc(meetup::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let total = meetups.len();

    let nearby: Vec<MeetupResponse> = filter_by_radius(meetups, origin.as_ref(), radius_km)
        .into_iter()
        .map(|m| {
            let distance = origin
                .as_ref()
                .map(|o| distance_km(o.coordinate, m.coordinate()));
            MeetupResponse::from_model(m, distance)
        })
        .collect();

    tracing::debug!(total, nearby = nearby.len(), radius_km, "Filtered meetups by distance");

    Ok(Json(NearbyMeetupsResponse {
        origin,
        radius_km,
        location_error,
        meetups: nearby,
    }))
}

// ============ Meetup Management ============

#[derive(Debug, Serialize)]
pub struct MeetupDetailResponse {
    #[serde(flatten)]
    pub meetup: MeetupResponse,
    pub participant_count: u64,
}

/// Get meetup details
pub async fn get_meetup(
    State(state): State<AppState>,
    Path(meetup_id): Path<Uuid>,
) -> AppResult<Json<MeetupDetailResponse>> {
    let meetup = meetup::Entity::find_by_id(meetup_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Meetup not found".to_string()))?;

    let participant_count = participant::Entity::find()
        .filter(participant::Column::MeetupId.eq(meetup_id))
        .count(&state.db)
        .await?;

    Ok(Json(MeetupDetailResponse {
        meetup: MeetupResponse::from_model(meetup, None),
        participant_count,
    }))
}

fn default_max_participants() -> i32 {
    10
}

fn default_category() -> String {
    "social".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateMeetupRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Address picked by the user; looked up from the coordinates when absent
    pub location: Option<String>,
    pub time: DateTime<Utc>,
    #[serde(default = "default_max_participants")]
    pub max_participants: i32,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub requirements: String,
    pub lat: f64,
    pub lng: f64,
}

fn picked_address(payload: &CreateMeetupRequest) -> Option<&str> {
    payload
        .location
        .as_deref()
        .map(str::trim)
        .filter(|address| !address.is_empty())
}

fn validate_meetup(payload: &CreateMeetupRequest, title: &str) -> AppResult<()> {
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    check_length("title", title, MAX_TITLE_LEN)?;
    check_length("category", &payload.category, MAX_CATEGORY_LEN)?;
    if let Some(address) = picked_address(payload) {
        check_length("location", address, MAX_ADDRESS_LEN)?;
    }

    if payload.max_participants <= 0 {
        return Err(AppError::BadRequest(
            "max_participants must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Create a meetup owned by the caller
pub async fn create_meetup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateMeetupRequest>,
) -> AppResult<Json<MeetupResponse>> {
    let title = payload.title.trim();
    validate_meetup(&payload, title)?;
    let coordinate = Coordinate::new(payload.lat, payload.lng)?;

    let address = match picked_address(&payload) {
        Some(address) => address.to_string(),
        _ => {
            let position = ReportedPosition::Known(coordinate);
            LocationResolver::new(Some(&position))
                .with_geocoder(state.reverse_geocoder())
                .resolve_current_location(&state.config.position_options())
                .await
                .map(|location| location.address_or_unknown().to_string())
                .map_err(|e| AppError::Internal(format!("Failed to resolve meetup address: {}", e)))?
        }
    };

    let meetup = meetup::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        description: Set(payload.description),
        location: Set(address),
        time: Set(payload.time.into()),
        max_participants: Set(payload.max_participants),
        category: Set(payload.category),
        requirements: Set(payload.requirements),
        creator_id: Set(claims.sub),
        lat: Set(coordinate.lat),
        lng: Set(coordinate.lng),
        ..Default::default()
    };

    let meetup = meetup.insert(&state.db).await?;
    tracing::info!(meetup_id = %meetup.id, creator_id = %claims.sub, "Meetup created");

    Ok(Json(MeetupResponse::from_model(meetup, None)))
}

/// Delete a meetup (creator only)
pub async fn delete_meetup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(meetup_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let meetup = meetup::Entity::find_by_id(meetup_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Meetup not found".to_string()))?;

    if meetup.creator_id != claims.sub {
        return Err(AppError::Forbidden(
            "Only the creator can delete this meetup".to_string(),
        ));
    }

    meetup::Entity::delete_by_id(meetup_id)
        .exec(&state.db)
        .await?;

    tracing::info!(meetup_id = %meetup_id, "Meetup deleted");

    Ok(Json(serde_json::json!({ "message": "Meetup deleted" })))
}
