use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub meetup_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meetup::Entity",
        from = "Column::MeetupId",
        to = "super::meetup::Column::Id"
    )]
    Meetup,
}

impl Related<super::meetup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
