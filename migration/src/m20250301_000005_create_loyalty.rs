use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000004_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoyaltyCard::Table)
                    .if_not_exists()
                    .col(uuid(LoyaltyCard::Id).primary_key())
                    .col(uuid(LoyaltyCard::UserId).not_null().unique_key())
                    .col(integer(LoyaltyCard::Points).not_null().default(0))
                    .col(integer(LoyaltyCard::TotalPointsEarned).not_null().default(0))
                    .col(string_len(LoyaltyCard::Tier, 20).not_null())
                    .col(
                        timestamp_with_time_zone(LoyaltyCard::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(LoyaltyCard::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoyaltyTransaction::Table)
                    .if_not_exists()
                    .col(uuid(LoyaltyTransaction::Id).primary_key())
                    .col(uuid(LoyaltyTransaction::CardId).not_null())
                    .col(uuid_null(LoyaltyTransaction::BookingId))
                    .col(integer(LoyaltyTransaction::Points).not_null())
                    .col(string_len(LoyaltyTransaction::Kind, 20).not_null())
                    .col(string_len(LoyaltyTransaction::Description, 255).not_null())
                    .col(
                        timestamp_with_time_zone(LoyaltyTransaction::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loyalty_tx_card")
                            .from(LoyaltyTransaction::Table, LoyaltyTransaction::CardId)
                            .to(LoyaltyCard::Table, LoyaltyCard::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loyalty_tx_booking")
                            .from(LoyaltyTransaction::Table, LoyaltyTransaction::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoyaltyTransaction::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LoyaltyCard::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum LoyaltyCard {
    Table,
    Id,
    UserId,
    Points,
    TotalPointsEarned,
    Tier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum LoyaltyTransaction {
    Table,
    Id,
    CardId,
    BookingId,
    Points,
    Kind,
    Description,
    CreatedAt,
}
