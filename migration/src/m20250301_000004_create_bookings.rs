use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_cafes::Branch;
use super::m20250301_000002_create_matches::Matches;
use super::m20250301_000003_create_seating::Seat;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(string_len(Booking::Code, 20).not_null().unique_key())
                    .col(uuid(Booking::UserId).not_null())
                    .col(uuid(Booking::MatchId).not_null())
                    .col(uuid(Booking::BranchId).not_null())
                    .col(integer(Booking::GuestsCount).not_null())
                    .col(string_len(Booking::Status, 20).not_null())
                    .col(double(Booking::Subtotal).not_null())
                    .col(double(Booking::ServiceFee).not_null())
                    .col(double(Booking::TotalAmount).not_null())
                    .col(string_len(Booking::Currency, 3).not_null())
                    .col(text_null(Booking::SpecialRequests))
                    .col(text(Booking::QrPayload).not_null())
                    .col(integer(Booking::LoyaltyPointsAwarded).not_null().default(0))
                    .col(timestamp_with_time_zone_null(Booking::CheckedInAt))
                    .col(timestamp_with_time_zone_null(Booking::CancelledAt))
                    .col(string_len_null(Booking::CancellationReason, 255))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_match")
                            .from(Booking::Table, Booking::MatchId)
                            .to(Matches::Table, Matches::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_branch")
                            .from(Booking::Table, Booking::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_match_user")
                    .table(Booking::Table)
                    .col(Booking::MatchId)
                    .col(Booking::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingSeat::Table)
                    .if_not_exists()
                    .col(uuid(BookingSeat::BookingId).not_null())
                    .col(uuid(BookingSeat::SeatId).not_null())
                    .col(double(BookingSeat::Price).not_null())
                    .col(timestamp_with_time_zone_null(BookingSeat::ReleasedAt))
                    .primary_key(
                        Index::create()
                            .name("pk_booking_seat")
                            .col(BookingSeat::BookingId)
                            .col(BookingSeat::SeatId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_seat_booking")
                            .from(BookingSeat::Table, BookingSeat::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_seat_seat")
                            .from(BookingSeat::Table, BookingSeat::SeatId)
                            .to(Seat::Table, Seat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(uuid(Payment::BookingId).not_null().unique_key())
                    .col(uuid(Payment::UserId).not_null())
                    .col(double(Payment::Amount).not_null())
                    .col(string_len(Payment::Currency, 3).not_null())
                    .col(string_len(Payment::Status, 20).not_null())
                    .col(string_len_null(Payment::Method, 30))
                    .col(string_len_null(Payment::GatewayRef, 100))
                    .col(string_len_null(Payment::Message, 255))
                    .col(timestamp_with_time_zone_null(Payment::PaidAt))
                    .col(timestamp_with_time_zone_null(Payment::RefundedAt))
                    .col(
                        timestamp_with_time_zone(Payment::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_booking")
                            .from(Payment::Table, Payment::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(BookingSeat::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    Code,
    UserId,
    MatchId,
    BranchId,
    GuestsCount,
    Status,
    Subtotal,
    ServiceFee,
    TotalAmount,
    Currency,
    SpecialRequests,
    QrPayload,
    LoyaltyPointsAwarded,
    CheckedInAt,
    CancelledAt,
    CancellationReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum BookingSeat {
    Table,
    BookingId,
    SeatId,
    Price,
    ReleasedAt,
}

#[derive(DeriveIden)]
pub enum Payment {
    Table,
    Id,
    BookingId,
    UserId,
    Amount,
    Currency,
    Status,
    Method,
    GatewayRef,
    Message,
    PaidAt,
    RefundedAt,
    CreatedAt,
}
