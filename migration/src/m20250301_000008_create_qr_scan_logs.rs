use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_cafes::Cafe;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Write-once audit trail; booking_id is kept without a foreign key so
        // not_found scans can be recorded too.
        manager
            .create_table(
                Table::create()
                    .table(QrScanLog::Table)
                    .if_not_exists()
                    .col(uuid(QrScanLog::Id).primary_key())
                    .col(uuid_null(QrScanLog::BookingId))
                    .col(uuid(QrScanLog::CafeId).not_null())
                    .col(uuid(QrScanLog::ScannedBy).not_null())
                    .col(text(QrScanLog::ScannedCode).not_null())
                    .col(string_len(QrScanLog::Result, 30).not_null())
                    .col(big_integer(QrScanLog::ProcessingMs).not_null())
                    .col(string_len_null(QrScanLog::ErrorMessage, 255))
                    .col(
                        timestamp_with_time_zone(QrScanLog::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scan_log_cafe")
                            .from(QrScanLog::Table, QrScanLog::CafeId)
                            .to(Cafe::Table, Cafe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scan_log_cafe_created")
                    .table(QrScanLog::Table)
                    .col(QrScanLog::CafeId)
                    .col(QrScanLog::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QrScanLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum QrScanLog {
    Table,
    Id,
    BookingId,
    CafeId,
    ScannedBy,
    ScannedCode,
    Result,
    ProcessingMs,
    ErrorMessage,
    CreatedAt,
}
