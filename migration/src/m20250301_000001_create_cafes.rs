use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cafe::Table)
                    .if_not_exists()
                    .col(uuid(Cafe::Id).primary_key())
                    .col(string_len(Cafe::Name, 150).not_null())
                    .col(uuid(Cafe::OwnerId).not_null())
                    .col(
                        timestamp_with_time_zone(Cafe::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Branch::Table)
                    .if_not_exists()
                    .col(uuid(Branch::Id).primary_key())
                    .col(uuid(Branch::CafeId).not_null())
                    .col(string_len(Branch::Name, 150).not_null())
                    .col(string_len_null(Branch::Address, 255))
                    .col(integer(Branch::TotalCapacity).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Branch::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_branch_cafe")
                            .from(Branch::Table, Branch::CafeId)
                            .to(Cafe::Table, Cafe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Branch::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Cafe::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Cafe {
    Table,
    Id,
    Name,
    OwnerId,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Branch {
    Table,
    Id,
    CafeId,
    Name,
    Address,
    TotalCapacity,
    CreatedAt,
}
