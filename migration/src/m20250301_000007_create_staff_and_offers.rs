use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_cafes::{Branch, Cafe};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StaffMember::Table)
                    .if_not_exists()
                    .col(uuid(StaffMember::Id).primary_key())
                    .col(uuid(StaffMember::CafeId).not_null())
                    .col(uuid(StaffMember::UserId).not_null())
                    .col(uuid_null(StaffMember::BranchId))
                    .col(string_len(StaffMember::Role, 30).not_null())
                    .col(
                        timestamp_with_time_zone(StaffMember::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_staff_cafe")
                            .from(StaffMember::Table, StaffMember::CafeId)
                            .to(Cafe::Table, Cafe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_staff_branch")
                            .from(StaffMember::Table, StaffMember::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Offer::Table)
                    .if_not_exists()
                    .col(uuid(Offer::Id).primary_key())
                    .col(uuid(Offer::CafeId).not_null())
                    .col(uuid_null(Offer::BranchId))
                    .col(string_len(Offer::Title, 150).not_null())
                    .col(text_null(Offer::Description))
                    .col(double(Offer::DiscountPercent).not_null())
                    .col(timestamp_with_time_zone(Offer::StartsAt).not_null())
                    .col(timestamp_with_time_zone(Offer::EndsAt).not_null())
                    .col(
                        timestamp_with_time_zone(Offer::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_cafe")
                            .from(Offer::Table, Offer::CafeId)
                            .to(Cafe::Table, Cafe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_branch")
                            .from(Offer::Table, Offer::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Offer::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(StaffMember::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum StaffMember {
    Table,
    Id,
    CafeId,
    UserId,
    BranchId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Offer {
    Table,
    Id,
    CafeId,
    BranchId,
    Title,
    Description,
    DiscountPercent,
    StartsAt,
    EndsAt,
    CreatedAt,
}
