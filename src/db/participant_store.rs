use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::discovery::participation::{NewParticipant, ParticipantStore};
use crate::entities::{meetup, participant};
use crate::utils::geo::{Coordinate, HasCoordinate};

/// `ParticipantStore` backed by the meetup and participant tables
pub struct DbParticipantStore<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> DbParticipantStore<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ParticipantStore for DbParticipantStore<'_> {
    async fn meetup_coordinate(&self, meetup_id: Uuid) -> Result<Option<Coordinate>, DbErr> {
        let meetup = meetup::Entity::find_by_id(meetup_id).one(self.db).await?;
        Ok(meetup.map(|m| m.coordinate()))
    }

    async fn find_participant(
        &self,
        meetup_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<participant::Model>, DbErr> {
        participant::Entity::find()
            .filter(participant::Column::MeetupId.eq(meetup_id))
            .filter(participant::Column::UserId.eq(user_id))
            .one(self.db)
            .await
    }

    async fn create_participant(&self, new: NewParticipant) -> Result<participant::Model, DbErr> {
        let address = new.location.address_or_unknown().to_string();

        participant::ActiveModel {
            id: Set(Uuid::new_v4()),
            meetup_id: Set(new.meetup_id),
            user_id: Set(new.user_id),
            name: Set(new.name),
            joined_at: Set(Utc::now().into()),
            distance_km: Set(new.distance_km),
            lat: Set(new.location.coordinate.lat),
            lng: Set(new.location.coordinate.lng),
            address: Set(address),
        }
        .insert(self.db)
        .await
    }
}
