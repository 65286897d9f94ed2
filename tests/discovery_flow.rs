use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use uuid::Uuid;

use meetup_backend::discovery::location::ReverseGeocoder;
use meetup_backend::discovery::participation::{NewParticipant, ParticipantStore};
use meetup_backend::discovery::{
    filter_by_radius, AuthUser, LocationError, LocationResolver, ParticipationError,
    ParticipationGate, PositionOptions, ReportedPosition, UNLIMITED_RADIUS_KM,
};
use meetup_backend::entities::participant;
use meetup_backend::handlers::participants::{join_location, settle_join, JoinRequest, JoinStatus};
use meetup_backend::AppError;
use meetup_backend::services::geocoding::GeocodingError;
use meetup_backend::utils::geo::{Coordinate, HasCoordinate};

const LONDON: Coordinate = Coordinate { lat: 51.5074, lng: -0.1278 };
const GREENWICH: Coordinate = Coordinate { lat: 51.4826, lng: -0.0077 };
const PARIS: Coordinate = Coordinate { lat: 48.8566, lng: 2.3522 };

#[derive(Debug, Clone, PartialEq)]
struct Meetup {
    id: Uuid,
    title: &'static str,
    at: Coordinate,
}

impl HasCoordinate for Meetup {
    fn coordinate(&self) -> Coordinate {
        self.at
    }
}

fn meetups() -> Vec<Meetup> {
    vec![
        Meetup { id: Uuid::new_v4(), title: "Paris picnic", at: PARIS },
        Meetup { id: Uuid::new_v4(), title: "Greenwich run", at: GREENWICH },
        Meetup { id: Uuid::new_v4(), title: "Soho coffee", at: LONDON },
    ]
}

struct StreetNames;

#[async_trait]
impl ReverseGeocoder for StreetNames {
    async fn reverse_geocode(&self, _coordinate: Coordinate) -> Result<Option<String>, GeocodingError> {
        Ok(Some("Trafalgar Square, London".to_string()))
    }
}

struct MemoryStore {
    meetups: Vec<Meetup>,
    participants: Mutex<Vec<participant::Model>>,
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn meetup_coordinate(&self, meetup_id: Uuid) -> Result<Option<Coordinate>, DbErr> {
        Ok(self.meetups.iter().find(|m| m.id == meetup_id).map(|m| m.at))
    }

    async fn find_participant(
        &self,
        meetup_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<participant::Model>, DbErr> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.meetup_id == meetup_id && p.user_id == user_id)
            .cloned())
    }

    async fn create_participant(&self, new: NewParticipant) -> Result<participant::Model, DbErr> {
        let model = participant::Model {
            id: Uuid::new_v4(),
            meetup_id: new.meetup_id,
            user_id: new.user_id,
            name: new.name,
            joined_at: Utc::now().into(),
            distance_km: new.distance_km,
            lat: new.location.coordinate.lat,
            lng: new.location.coordinate.lng,
            address: new.location.address_or_unknown().to_string(),
        };
        self.participants.lock().unwrap().push(model.clone());
        Ok(model)
    }
}

#[tokio::test]
async fn test_nearby_meetups_from_london() {
    let position = ReportedPosition::Known(LONDON);
    let geocoder = StreetNames;
    let origin = LocationResolver::new(Some(&position))
        .with_geocoder(Some(&geocoder))
        .resolve_current_location(&PositionOptions::default())
        .await
        .unwrap();

    assert_eq!(origin.address.as_deref(), Some("Trafalgar Square, London"));

    let nearby: Vec<&str> = filter_by_radius(meetups(), Some(&origin), 50.0)
        .into_iter()
        .map(|m| m.title)
        .collect();
    assert_eq!(nearby, vec!["Greenwich run", "Soho coffee"]);

    let all = meetups();
    let everywhere = filter_by_radius(all.clone(), Some(&origin), UNLIMITED_RADIUS_KM);
    assert_eq!(everywhere, all);
}

#[tokio::test]
async fn test_denied_location_shows_everything() {
    let denied = ReportedPosition::Denied;
    let result = LocationResolver::new(Some(&denied))
        .resolve_current_location(&PositionOptions::default())
        .await;

    assert_eq!(result.unwrap_err(), LocationError::PermissionDenied);

    let all = filter_by_radius(meetups(), None, 1.0);
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].title, "Paris picnic");
}

#[tokio::test]
async fn test_join_snapshot_survives_moving() {
    let list = meetups();
    let soho = list[2].id;
    let store = MemoryStore {
        meetups: list,
        participants: Mutex::new(Vec::new()),
    };
    let user = AuthUser {
        id: Uuid::new_v4(),
        name: "Grace".to_string(),
    };

    let here = ReportedPosition::Known(GREENWICH);
    let resolver = LocationResolver::new(Some(&here));
    let first = ParticipationGate::new(&store)
        .with_location_resolver(&resolver, PositionOptions::default())
        .join(soho, Some(&user), None)
        .await
        .unwrap();

    assert!(first.is_new());
    let snapshot = first.participant().distance_km;
    assert!(snapshot > 5.0 && snapshot < 15.0);
    assert_eq!(first.participant().address, "Unknown location");

    let moved = ReportedPosition::Known(PARIS);
    let resolver = LocationResolver::new(Some(&moved));
    let second = ParticipationGate::new(&store)
        .with_location_resolver(&resolver, PositionOptions::default())
        .join(soho, Some(&user), None)
        .await
        .unwrap();

    assert!(!second.is_new());
    assert_eq!(second.participant().distance_km, snapshot);
    assert_eq!(store.participants.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_join_error_precedence() {
    let store = MemoryStore {
        meetups: meetups(),
        participants: Mutex::new(Vec::new()),
    };
    let gate = ParticipationGate::new(&store);

    // Not signed in beats an unknown meetup
    let err = gate.join(Uuid::new_v4(), None, None).await.unwrap_err();
    assert!(matches!(err, ParticipationError::NotAuthenticated));

    let user = AuthUser {
        id: Uuid::new_v4(),
        name: "Grace".to_string(),
    };
    let err = gate.join(Uuid::new_v4(), Some(&user), None).await.unwrap_err();
    assert!(matches!(err, ParticipationError::MeetupNotFound));

    let known = store.meetups[0].id;
    let err = gate.join(known, Some(&user), None).await.unwrap_err();
    assert!(matches!(err, ParticipationError::LocationRequired));
}

#[tokio::test]
async fn test_invalid_join_body_does_not_mask_auth_or_membership() {
    let list = meetups();
    let soho = list[2].id;
    let store = MemoryStore {
        meetups: list,
        participants: Mutex::new(Vec::new()),
    };
    let gate = ParticipationGate::new(&store);
    let off_the_map = || {
        join_location(Some(JoinRequest {
            lat: Some(95.0),
            lng: Some(0.0),
            address: Some("North of north".to_string()),
        }))
    };

    // Anonymous: 401, not a coordinate complaint
    let body = off_the_map();
    let result = gate.join(soho, None, body.candidate).await;
    let err = settle_join(result, body.rejected).unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    // New member: the coordinate problem is what they need to fix
    let user = AuthUser {
        id: Uuid::new_v4(),
        name: "Grace".to_string(),
    };
    let body = off_the_map();
    let result = gate.join(soho, Some(&user), body.candidate).await;
    let err = settle_join(result, body.rejected).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("latitude")));

    // Existing member: already joined, whatever the body says
    let valid = join_location(Some(JoinRequest {
        lat: Some(GREENWICH.lat),
        lng: Some(GREENWICH.lng),
        address: Some("Greenwich Park".to_string()),
    }));
    gate.join(soho, Some(&user), valid.candidate).await.unwrap();

    let body = off_the_map();
    let result = gate.join(soho, Some(&user), body.candidate).await;
    let response = settle_join(result, body.rejected).unwrap();
    assert!(matches!(response.status, JoinStatus::AlreadyJoined));
    assert_eq!(response.participant.address, "Greenwich Park");
}

#[tokio::test]
async fn test_missing_join_body() {
    let list = meetups();
    let soho = list[2].id;
    let store = MemoryStore {
        meetups: list,
        participants: Mutex::new(Vec::new()),
    };
    let gate = ParticipationGate::new(&store);

    let body = join_location(None);
    let result = gate.join(soho, None, body.candidate).await;
    assert!(matches!(settle_join(result, body.rejected), Err(AppError::Unauthorized(_))));

    let user = AuthUser {
        id: Uuid::new_v4(),
        name: "Grace".to_string(),
    };
    let body = join_location(None);
    let result = gate.join(soho, Some(&user), body.candidate).await;
    assert!(matches!(result, Err(ParticipationError::LocationRequired)));
}
