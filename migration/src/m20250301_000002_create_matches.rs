use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_cafes::Branch;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Team::Table)
                    .if_not_exists()
                    .col(pk_auto(Team::Id))
                    .col(string_len(Team::Name, 100).not_null().unique_key())
                    .col(string_len_null(Team::ShortName, 10))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(uuid(Matches::Id).primary_key())
                    .col(uuid(Matches::BranchId).not_null())
                    .col(integer(Matches::HomeTeamId).not_null())
                    .col(integer(Matches::AwayTeamId).not_null())
                    .col(date(Matches::MatchDate).not_null())
                    .col(time(Matches::KickOff).not_null())
                    .col(string_len(Matches::Status, 20).not_null())
                    .col(integer(Matches::TotalSeats).not_null())
                    .col(integer(Matches::SeatsAvailable).not_null())
                    .col(double(Matches::PricePerSeat).not_null())
                    .col(string_len(Matches::Currency, 3).not_null())
                    .col(integer(Matches::DurationMinutes).not_null().default(120))
                    .col(boolean(Matches::IsPublished).not_null().default(false))
                    .col(timestamp_with_time_zone_null(Matches::BookingOpensAt))
                    .col(timestamp_with_time_zone_null(Matches::BookingClosesAt))
                    .col(timestamp_with_time_zone_null(Matches::LastReminderAt))
                    .col(
                        timestamp_with_time_zone(Matches::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_branch")
                            .from(Matches::Table, Matches::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_home_team")
                            .from(Matches::Table, Matches::HomeTeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_away_team")
                            .from(Matches::Table, Matches::AwayTeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_matches_branch_date")
                    .table(Matches::Table)
                    .col(Matches::BranchId)
                    .col(Matches::MatchDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Matches::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Team::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Team {
    Table,
    Id,
    Name,
    ShortName,
}

#[derive(DeriveIden)]
pub enum Matches {
    Table,
    Id,
    BranchId,
    HomeTeamId,
    AwayTeamId,
    MatchDate,
    KickOff,
    Status,
    TotalSeats,
    SeatsAvailable,
    PricePerSeat,
    Currency,
    DurationMinutes,
    IsPublished,
    BookingOpensAt,
    BookingClosesAt,
    LastReminderAt,
    CreatedAt,
}
