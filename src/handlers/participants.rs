use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DbParticipantStore;
use crate::discovery::location::{Location, LocationResolver, ReportedPosition};
use crate::discovery::participation::{
    AuthUser, JoinOutcome, ParticipationError, ParticipationGate,
};
use crate::entities::{meetup, participant};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::utils::limits::{check_length, MAX_ADDRESS_LEN};
use crate::AppState;

/// Participants who joined from further than this are flagged in listings
pub const FAR_AWAY_KM: f64 = 50.0;

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub id: Uuid,
    pub meetup_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub joined_at: DateTime<Utc>,
    pub distance_km: f64,
    pub far_away: bool,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl From<participant::Model> for ParticipantResponse {
    fn from(p: participant::Model) -> Self {
        Self {
            id: p.id,
            meetup_id: p.meetup_id,
            user_id: p.user_id,
            name: p.name,
            joined_at: p.joined_at.with_timezone(&Utc),
            distance_km: p.distance_km,
            far_away: p.distance_km > FAR_AWAY_KM,
            lat: p.lat,
            lng: p.lng,
            address: p.address,
        }
    }
}

/// List a meetup's participants in join order
pub async fn list_participants(
    State(state): State<AppState>,
    Path(meetup_id): Path<Uuid>,
) -> AppResult<Json<Vec<ParticipantResponse>>> {
    meetup::Entity::find_by_id(meetup_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Meetup not found".to_string()))?;

    let participants = participant::Entity::find()
        .filter(participant::Column::MeetupId.eq(meetup_id))
        .order_by_asc(participant::Column::JoinedAt)
        .all(&state.db)
        .await?;

    Ok(Json(participants.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Joined,
    AlreadyJoined,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub status: JoinStatus,
    pub participant: ParticipantResponse,
}

impl From<JoinOutcome> for JoinResponse {
    fn from(outcome: JoinOutcome) -> Self {
        let status = if outcome.is_new() {
            JoinStatus::Joined
        } else {
            JoinStatus::AlreadyJoined
        };

        Self {
            status,
            participant: outcome.into_participant().into(),
        }
    }
}

/// What a join body says about where the user is.
///
/// A body that can't be used is not an error by itself: the gate may not need
/// a location at all, so `rejected` is only reported when it asks for one.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinLocation {
    pub candidate: Option<Location>,
    pub reported: ReportedPosition,
    pub rejected: Option<String>,
}

impl JoinLocation {
    fn unusable(reason: String) -> Self {
        Self {
            candidate: None,
            reported: ReportedPosition::Missing,
            rejected: Some(reason),
        }
    }
}

pub fn join_location(body: Option<JoinRequest>) -> JoinLocation {
    let JoinRequest { lat, lng, address } = body.unwrap_or_default();

    let address = address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    if let Some(address) = &address {
        if let Err(e) = check_length("address", address, MAX_ADDRESS_LEN) {
            return JoinLocation::unusable(e.to_string());
        }
    }

    let reported = match ReportedPosition::from_parts(lat, lng, false) {
        Ok(reported) => reported,
        Err(e) => return JoinLocation::unusable(e.to_string()),
    };

    match (reported, address) {
        (ReportedPosition::Known(coordinate), Some(address)) => JoinLocation {
            candidate: Some(Location::new(coordinate, Some(address))),
            reported: ReportedPosition::Missing,
            rejected: None,
        },
        (reported, _) => JoinLocation {
            candidate: None,
            reported,
            rejected: None,
        },
    }
}

/// Turn the gate's answer into the response, reporting an unusable body in
/// place of `LocationRequired`
pub fn settle_join(
    result: Result<JoinOutcome, ParticipationError>,
    rejected: Option<String>,
) -> AppResult<JoinResponse> {
    match (result, rejected) {
        (Err(ParticipationError::LocationRequired), Some(reason)) => {
            Err(AppError::BadRequest(reason))
        }
        (result, _) => Ok(result?.into()),
    }
}

/// Join a meetup.
///
/// A body with coordinates and an address is used as is. Coordinates alone get
/// their address looked up. Without a usable body only existing members succeed.
pub async fn join_meetup(
    State(state): State<AppState>,
    Path(meetup_id): Path<Uuid>,
    claims: Option<Extension<Claims>>,
    body: Option<Json<JoinRequest>>,
) -> AppResult<Json<JoinResponse>> {
    let user = claims.map(|Extension(claims)| AuthUser::from(&claims));
    let JoinLocation {
        candidate,
        reported,
        rejected,
    } = join_location(body.map(|Json(body)| body));

    let store = DbParticipantStore::new(&state.db);
    let resolver = LocationResolver::new(Some(&reported)).with_geocoder(state.reverse_geocoder());

    let result = ParticipationGate::new(&store)
        .with_location_resolver(&resolver, state.config.position_options())
        .join(meetup_id, user.as_ref(), candidate)
        .await;

    settle_join(result, rejected).map(Json)
}

/// Remove a participant (meetup creator only)
pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((meetup_id, participant_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let meetup = meetup::Entity::find_by_id(meetup_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Meetup not found".to_string()))?;

    if meetup.creator_id != claims.sub {
        return Err(AppError::Forbidden(
            "Only the creator can remove participants".to_string(),
        ));
    }

    let participant = participant::Entity::find_by_id(participant_id)
        .filter(participant::Column::MeetupId.eq(meetup_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

    let user_id = participant.user_id;
    participant.delete(&state.db).await?;

    tracing::info!(meetup_id = %meetup_id, user_id = %user_id, "Participant removed");

    Ok(Json(serde_json::json!({ "message": "Participant removed" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::geo::Coordinate;
    use axum::http::StatusCode;

    fn participant(distance_km: f64) -> participant::Model {
        participant::Model {
            id: Uuid::new_v4(),
            meetup_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Ada".to_string(),
            joined_at: Utc::now().into(),
            distance_km,
            lat: 51.5074,
            lng: -0.1278,
            address: "London".to_string(),
        }
    }

    #[test]
    fn test_far_away_flag() {
        assert!(!ParticipantResponse::from(participant(12.0)).far_away);
        assert!(!ParticipantResponse::from(participant(FAR_AWAY_KM)).far_away);
        assert!(ParticipantResponse::from(participant(343.5)).far_away);
    }

    #[test]
    fn test_join_response_status() {
        let joined = JoinResponse::from(JoinOutcome::Joined(participant(1.0)));
        let again = JoinResponse::from(JoinOutcome::AlreadyJoined(participant(1.0)));

        assert_eq!(serde_json::to_value(&joined).unwrap()["status"], "joined");
        assert_eq!(serde_json::to_value(&again).unwrap()["status"], "already_joined");
    }

    fn body(lat: Option<f64>, lng: Option<f64>, address: Option<&str>) -> Option<JoinRequest> {
        Some(JoinRequest {
            lat,
            lng,
            address: address.map(str::to_string),
        })
    }

    #[test]
    fn test_full_body_is_used_directly() {
        let location = join_location(body(Some(51.5074), Some(-0.1278), Some(" Soho ")));

        assert_eq!(
            location.candidate,
            Some(Location::new(
                Coordinate { lat: 51.5074, lng: -0.1278 },
                Some("Soho".to_string())
            ))
        );
        assert_eq!(location.reported, ReportedPosition::Missing);
        assert_eq!(location.rejected, None);
    }

    #[test]
    fn test_coordinates_alone_are_resolved() {
        let location = join_location(body(Some(51.5074), Some(-0.1278), Some("  ")));

        assert_eq!(location.candidate, None);
        assert_eq!(
            location.reported,
            ReportedPosition::Known(Coordinate { lat: 51.5074, lng: -0.1278 })
        );
        assert_eq!(location.rejected, None);
    }

    #[test]
    fn test_empty_or_missing_body() {
        for empty in [None, body(None, None, None), body(Some(51.5), None, Some("Soho"))] {
            let location = join_location(empty);
            assert_eq!(location.candidate, None);
            assert_eq!(location.reported, ReportedPosition::Missing);
            assert_eq!(location.rejected, None);
        }
    }

    #[test]
    fn test_unusable_body_is_deferred() {
        let out_of_range = join_location(body(Some(95.0), Some(0.0), Some("North of north")));
        assert_eq!(out_of_range.candidate, None);
        assert_eq!(out_of_range.reported, ReportedPosition::Missing);
        assert!(out_of_range.rejected.is_some());

        let long_address = "a".repeat(MAX_ADDRESS_LEN + 1);
        let too_long = join_location(body(Some(51.5), Some(-0.1), Some(&long_address)));
        assert_eq!(too_long.candidate, None);
        assert!(too_long.rejected.is_some());
    }

    #[test]
    fn test_unusable_body_only_matters_when_a_location_is_needed() {
        let reason = Some("latitude out of range".to_string());

        let err = settle_join(Err(ParticipationError::NotAuthenticated), reason.clone()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = settle_join(Err(ParticipationError::MeetupNotFound), reason.clone()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let existing = settle_join(Ok(JoinOutcome::AlreadyJoined(participant(3.0))), reason.clone()).unwrap();
        assert!(matches!(existing.status, JoinStatus::AlreadyJoined));

        let err = settle_join(Err(ParticipationError::LocationRequired), reason).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "latitude out of range"));

        let err = settle_join(Err(ParticipationError::LocationRequired), None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
