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
                    .table(SeatingSection::Table)
                    .if_not_exists()
                    .col(uuid(SeatingSection::Id).primary_key())
                    .col(uuid(SeatingSection::BranchId).not_null())
                    .col(string_len(SeatingSection::Name, 100).not_null())
                    .col(string_len(SeatingSection::SectionType, 20).not_null())
                    .col(integer(SeatingSection::TotalSeats).not_null())
                    .col(double(SeatingSection::ExtraCost).not_null().default(0.0))
                    .col(
                        timestamp_with_time_zone(SeatingSection::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_branch")
                            .from(SeatingSection::Table, SeatingSection::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Seat::Table)
                    .if_not_exists()
                    .col(uuid(Seat::Id).primary_key())
                    .col(uuid(Seat::SectionId).not_null())
                    .col(string_len(Seat::Label, 20).not_null())
                    .col(integer(Seat::Sequence).not_null())
                    .col(boolean(Seat::IsAvailable).not_null().default(true))
                    .col(integer_null(Seat::TableNumber))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_section")
                            .from(Seat::Table, Seat::SectionId)
                            .to(SeatingSection::Table, SeatingSection::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_seat_section_sequence")
                    .table(Seat::Table)
                    .col(Seat::SectionId)
                    .col(Seat::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Seat::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SeatingSection::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SeatingSection {
    Table,
    Id,
    BranchId,
    Name,
    SectionType,
    TotalSeats,
    ExtraCost,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Seat {
    Table,
    Id,
    SectionId,
    Label,
    Sequence,
    IsAvailable,
    TableNumber,
}
