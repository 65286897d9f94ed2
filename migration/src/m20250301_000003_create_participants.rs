use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_meetups::Meetup;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Participant::Table)
                    .if_not_exists()
                    .col(uuid(Participant::Id).primary_key())
                    .col(uuid(Participant::MeetupId).not_null())
                    .col(uuid(Participant::UserId).not_null())
                    .col(string_len(Participant::Name, 100).not_null())
                    .col(
                        timestamp_with_time_zone(Participant::JoinedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(double(Participant::DistanceKm).not_null())
                    .col(double(Participant::Lat).not_null())
                    .col(double(Participant::Lng).not_null())
                    .col(string_len(Participant::Address, 500).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participant_meetup")
                            .from(Participant::Table, Participant::MeetupId)
                            .to(Meetup::Table, Meetup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participant_user")
                            .from(Participant::Table, Participant::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership per (meetup, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_participant_meetup_user")
                    .table(Participant::Table)
                    .col(Participant::MeetupId)
                    .col(Participant::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Participant::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Participant {
    Table,
    Id,
    MeetupId,
    UserId,
    Name,
    JoinedAt,
    DistanceKm,
    Lat,
    Lng,
    Address,
}
