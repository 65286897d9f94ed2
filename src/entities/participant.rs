use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's membership in a meetup. `distance_km` is the distance between the
/// user and the meetup at the moment they joined and is never recomputed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub meetup_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub joined_at: DateTimeWithTimeZone,
    pub distance_km: f64,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meetup::Entity",
        from = "Column::MeetupId",
        to = "super::meetup::Column::Id"
    )]
    Meetup,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::meetup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetup.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
