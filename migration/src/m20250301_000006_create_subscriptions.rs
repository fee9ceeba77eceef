use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_cafes::Cafe;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SubscriptionPlan::Table)
                    .if_not_exists()
                    .col(uuid(SubscriptionPlan::Id).primary_key())
                    .col(string_len(SubscriptionPlan::Name, 100).not_null())
                    .col(string_len(SubscriptionPlan::Slug, 50).not_null().unique_key())
                    .col(double(SubscriptionPlan::PriceMonthly).not_null())
                    // NULL means unbounded
                    .col(integer_null(SubscriptionPlan::MaxBranches))
                    .col(integer_null(SubscriptionPlan::MaxMatchesPerMonth))
                    .col(integer_null(SubscriptionPlan::MaxBookingsPerMonth))
                    .col(integer_null(SubscriptionPlan::MaxStaff))
                    .col(integer_null(SubscriptionPlan::MaxOffers))
                    .col(boolean(SubscriptionPlan::HasAnalytics).not_null().default(false))
                    .col(boolean(SubscriptionPlan::HasLoyalty).not_null().default(false))
                    .col(boolean(SubscriptionPlan::HasCustomBranding).not_null().default(false))
                    .col(boolean(SubscriptionPlan::IsActive).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(SubscriptionPlan::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CafeSubscription::Table)
                    .if_not_exists()
                    .col(uuid(CafeSubscription::Id).primary_key())
                    .col(uuid(CafeSubscription::CafeId).not_null())
                    .col(uuid(CafeSubscription::PlanId).not_null())
                    .col(string_len(CafeSubscription::Status, 20).not_null())
                    .col(timestamp_with_time_zone(CafeSubscription::StartsAt).not_null())
                    .col(timestamp_with_time_zone(CafeSubscription::EndsAt).not_null())
                    .col(
                        timestamp_with_time_zone(CafeSubscription::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_cafe")
                            .from(CafeSubscription::Table, CafeSubscription::CafeId)
                            .to(Cafe::Table, Cafe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_plan")
                            .from(CafeSubscription::Table, CafeSubscription::PlanId)
                            .to(SubscriptionPlan::Table, SubscriptionPlan::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CafeSubscription::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SubscriptionPlan::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SubscriptionPlan {
    Table,
    Id,
    Name,
    Slug,
    PriceMonthly,
    MaxBranches,
    MaxMatchesPerMonth,
    MaxBookingsPerMonth,
    MaxStaff,
    MaxOffers,
    HasAnalytics,
    HasLoyalty,
    HasCustomBranding,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum CafeSubscription {
    Table,
    Id,
    CafeId,
    PlanId,
    Status,
    StartsAt,
    EndsAt,
    CreatedAt,
}
