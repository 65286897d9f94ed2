use async_trait::async_trait;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::discovery::location::{Location, LocationResolver, PositionOptions};
use crate::entities::participant;
use crate::utils::geo::{distance_km, Coordinate};
use crate::utils::jwt::Claims;

/// The signed-in user attempting to join
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub meetup_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub location: Location,
    pub distance_km: f64,
}

/// Storage the gate reads memberships from and writes them to
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn meetup_coordinate(&self, meetup_id: Uuid) -> Result<Option<Coordinate>, DbErr>;

    async fn find_participant(
        &self,
        meetup_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<participant::Model>, DbErr>;

    async fn create_participant(&self, new: NewParticipant) -> Result<participant::Model, DbErr>;
}

#[derive(Debug, thiserror::Error)]
pub enum ParticipationError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("meetup not found")]
    MeetupNotFound,
    #[error("a location is required to join")]
    LocationRequired,
    #[error("failed to persist participant: {0}")]
    Persistence(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined(participant::Model),
    /// The user was already a member; the existing record is returned untouched
    AlreadyJoined(participant::Model),
}

impl JoinOutcome {
    pub fn participant(&self) -> &participant::Model {
        match self {
            JoinOutcome::Joined(p) | JoinOutcome::AlreadyJoined(p) => p,
        }
    }

    pub fn into_participant(self) -> participant::Model {
        match self {
            JoinOutcome::Joined(p) | JoinOutcome::AlreadyJoined(p) => p,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, JoinOutcome::Joined(_))
    }
}

/// Decides whether a user may join a meetup and records the join.
///
/// Membership goes `NotJoined -> Joined` once and never back through here.
/// The duplicate check reads before it writes without a transaction, so two
/// concurrent joins for the same pair can both get past it; the store's unique
/// index rejects the second write, which then surfaces as `Persistence`.
pub struct ParticipationGate<'a, S: ParticipantStore + ?Sized> {
    store: &'a S,
    on_demand: Option<(&'a LocationResolver<'a>, PositionOptions)>,
}

impl<'a, S: ParticipantStore + ?Sized> ParticipationGate<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            on_demand: None,
        }
    }

    /// Resolver to try when a join arrives without a location
    pub fn with_location_resolver(
        mut self,
        resolver: &'a LocationResolver<'a>,
        options: PositionOptions,
    ) -> Self {
        self.on_demand = Some((resolver, options));
        self
    }

    pub async fn join(
        &self,
        meetup_id: Uuid,
        user: Option<&AuthUser>,
        candidate: Option<Location>,
    ) -> Result<JoinOutcome, ParticipationError> {
        let user = user.ok_or(ParticipationError::NotAuthenticated)?;

        let meetup_at = self
            .store
            .meetup_coordinate(meetup_id)
            .await?
            .ok_or(ParticipationError::MeetupNotFound)?;

        if let Some(existing) = self.store.find_participant(meetup_id, user.id).await? {
            tracing::debug!(meetup_id = %meetup_id, user_id = %user.id, "User already joined");
            return Ok(JoinOutcome::AlreadyJoined(existing));
        }

        let location = match candidate {
            Some(location) => location,
            None => self
                .resolve_on_demand()
                .await
                .ok_or(ParticipationError::LocationRequired)?,
        };

        let distance_km = distance_km(location.coordinate, meetup_at);

        let participant = self
            .store
            .create_participant(NewParticipant {
                meetup_id,
                user_id: user.id,
                name: user.name.clone(),
                location,
                distance_km,
            })
            .await?;

        tracing::info!(
            meetup_id = %meetup_id,
            user_id = %user.id,
            distance_km = distance_km,
            "User joined meetup"
        );

        Ok(JoinOutcome::Joined(participant))
    }

    async fn resolve_on_demand(&self) -> Option<Location> {
        let (resolver, options) = self.on_demand.as_ref()?;

        match resolver.resolve_current_location(options).await {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::debug!(error = %e, "No location available for join");
                None
            }
        }
    }
}
