use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Meetup::Table)
                    .if_not_exists()
                    .col(uuid(Meetup::Id).primary_key())
                    .col(string_len(Meetup::Title, 200).not_null())
                    .col(text(Meetup::Description).not_null())
                    .col(string_len(Meetup::Location, 500).not_null())
                    .col(timestamp_with_time_zone(Meetup::Time).not_null())
                    .col(integer(Meetup::MaxParticipants).not_null())
                    .col(string_len(Meetup::Category, 50).not_null())
                    .col(text(Meetup::Requirements).not_null())
                    .col(uuid(Meetup::CreatorId).not_null())
                    .col(double(Meetup::Lat).not_null())
                    .col(double(Meetup::Lng).not_null())
                    .col(
                        timestamp_with_time_zone(Meetup::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meetup_creator")
                            .from(Meetup::Table, Meetup::CreatorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Meetup::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Meetup {
    Table,
    Id,
    Title,
    Description,
    Location,
    Time,
    MaxParticipants,
    Category,
    Requirements,
    CreatorId,
    Lat,
    Lng,
    CreatedAt,
}
