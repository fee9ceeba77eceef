use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A `None` ceiling means the resource is unbounded on this plan.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_plan")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub price_monthly: f64,
    pub max_branches: Option<i32>,
    pub max_matches_per_month: Option<i32>,
    pub max_bookings_per_month: Option<i32>,
    pub max_staff: Option<i32>,
    pub max_offers: Option<i32>,
    pub has_analytics: bool,
    pub has_loyalty: bool,
    pub has_custom_branding: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cafe_subscription::Entity")]
    Subscriptions,
}

impl Related<super::cafe_subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
