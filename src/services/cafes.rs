//! Cafés, branches and the catalogue around them: teams, staff, offers,
//! subscription plans and subscriptions.

use chrono::{DateTime, Months, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::cafe_subscription::{self, SubscriptionStatus};
use crate::entities::{branch, cafe, offer, staff_member, subscription_plan, team};
use crate::error::{AppError, AppResult};
use crate::services::admission::{self, ResourceKind};
use crate::utils::money::round2;

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

async fn find_cafe<C: ConnectionTrait>(conn: &C, cafe_id: Uuid) -> AppResult<cafe::Model> {
    cafe::Entity::find_by_id(cafe_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Café not found".to_string()))
}

pub async fn create_cafe(
    db: &DatabaseConnection,
    name: &str,
    owner_id: Uuid,
) -> AppResult<cafe::Model> {
    let cafe = cafe::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(required(name, "Name")?),
        owner_id: Set(owner_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    tracing::info!(cafe_id = %cafe.id, owner_id = %owner_id, "Café created");
    Ok(cafe)
}

#[derive(Debug, Clone)]
pub struct NewBranch {
    pub name: String,
    pub address: Option<String>,
    pub total_capacity: i32,
}

pub async fn create_branch(
    db: &DatabaseConnection,
    cafe_id: Uuid,
    input: NewBranch,
    now: DateTime<Utc>,
) -> AppResult<branch::Model> {
    let name = required(&input.name, "Name")?;
    if input.total_capacity < 0 {
        return Err(AppError::Validation("Capacity cannot be negative".to_string()));
    }

    let txn = db.begin().await?;
    find_cafe(&txn, cafe_id).await?;
    admission::ensure_admitted(&txn, cafe_id, ResourceKind::Branch, now).await?;

    let branch = branch::ActiveModel {
        id: Set(Uuid::new_v4()),
        cafe_id: Set(cafe_id),
        name: Set(name),
        address: Set(input.address.filter(|a| !a.trim().is_empty())),
        total_capacity: Set(input.total_capacity),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(branch_id = %branch.id, cafe_id = %cafe_id, "Branch created");
    Ok(branch)
}

pub async fn find_branch<C: ConnectionTrait>(conn: &C, branch_id: Uuid) -> AppResult<branch::Model> {
    branch::Entity::find_by_id(branch_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))
}

pub async fn create_team(
    db: &DatabaseConnection,
    name: &str,
    short_name: Option<String>,
) -> AppResult<team::Model> {
    let name = required(name, "Team name")?;
    let taken = team::Entity::find()
        .filter(team::Column::Name.eq(name.as_str()))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(AppError::BadRequest(format!("Team {} already exists", name)));
    }

    Ok(team::ActiveModel {
        name: Set(name),
        short_name: Set(short_name.filter(|s| !s.trim().is_empty())),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

pub async fn list_teams<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<team::Model>> {
    Ok(team::Entity::find()
        .order_by_asc(team::Column::Name)
        .all(conn)
        .await?)
}

pub async fn add_staff_member(
    db: &DatabaseConnection,
    cafe_id: Uuid,
    user_id: Uuid,
    branch_id: Option<Uuid>,
    role: &str,
    now: DateTime<Utc>,
) -> AppResult<staff_member::Model> {
    let role = required(role, "Role")?;

    let txn = db.begin().await?;
    find_cafe(&txn, cafe_id).await?;
    if let Some(branch_id) = branch_id {
        let branch = find_branch(&txn, branch_id).await?;
        if branch.cafe_id != cafe_id {
            return Err(AppError::Validation(
                "Branch belongs to another café".to_string(),
            ));
        }
    }

    let existing = staff_member::Entity::find()
        .filter(staff_member::Column::CafeId.eq(cafe_id))
        .filter(staff_member::Column::UserId.eq(user_id))
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(AppError::BadRequest(
            "User is already on this café's staff".to_string(),
        ));
    }

    admission::ensure_admitted(&txn, cafe_id, ResourceKind::Staff, now).await?;

    let member = staff_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        cafe_id: Set(cafe_id),
        user_id: Set(user_id),
        branch_id: Set(branch_id),
        role: Set(role),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(cafe_id = %cafe_id, user_id = %user_id, "Staff member added");
    Ok(member)
}

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub branch_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: f64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

pub async fn create_offer(
    db: &DatabaseConnection,
    cafe_id: Uuid,
    input: NewOffer,
    now: DateTime<Utc>,
) -> AppResult<offer::Model> {
    let title = required(&input.title, "Title")?;
    if !(0.0..=100.0).contains(&input.discount_percent) {
        return Err(AppError::Validation(
            "Discount must be between 0 and 100 percent".to_string(),
        ));
    }
    if input.starts_at >= input.ends_at {
        return Err(AppError::Validation("Offer must start before it ends".to_string()));
    }

    let txn = db.begin().await?;
    find_cafe(&txn, cafe_id).await?;
    if let Some(branch_id) = input.branch_id {
        if find_branch(&txn, branch_id).await?.cafe_id != cafe_id {
            return Err(AppError::Validation(
                "Branch belongs to another café".to_string(),
            ));
        }
    }
    admission::ensure_admitted(&txn, cafe_id, ResourceKind::Offer, now).await?;

    let offer = offer::ActiveModel {
        id: Set(Uuid::new_v4()),
        cafe_id: Set(cafe_id),
        branch_id: Set(input.branch_id),
        title: Set(title),
        description: Set(input.description),
        discount_percent: Set(round2(input.discount_percent)),
        starts_at: Set(input.starts_at.into()),
        ends_at: Set(input.ends_at.into()),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(offer)
}

/// Plan ceilings; `None` leaves a resource unbounded.
#[derive(Debug, Clone, Default)]
pub struct NewPlan {
    pub name: String,
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
}

pub async fn create_plan(
    db: &DatabaseConnection,
    input: NewPlan,
) -> AppResult<subscription_plan::Model> {
    let name = required(&input.name, "Name")?;
    let slug = required(&input.slug, "Slug")?.to_lowercase();
    if input.price_monthly < 0.0 {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    let ceilings = [
        input.max_branches,
        input.max_matches_per_month,
        input.max_bookings_per_month,
        input.max_staff,
        input.max_offers,
    ];
    if ceilings.iter().flatten().any(|limit| *limit < 0) {
        return Err(AppError::Validation("Plan limits cannot be negative".to_string()));
    }

    let taken = subscription_plan::Entity::find()
        .filter(subscription_plan::Column::Slug.eq(slug.as_str()))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(AppError::BadRequest(format!("Plan {} already exists", slug)));
    }

    Ok(subscription_plan::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        slug: Set(slug),
        price_monthly: Set(round2(input.price_monthly)),
        max_branches: Set(input.max_branches),
        max_matches_per_month: Set(input.max_matches_per_month),
        max_bookings_per_month: Set(input.max_bookings_per_month),
        max_staff: Set(input.max_staff),
        max_offers: Set(input.max_offers),
        has_analytics: Set(input.has_analytics),
        has_loyalty: Set(input.has_loyalty),
        has_custom_branding: Set(input.has_custom_branding),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?)
}

pub async fn list_plans<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<subscription_plan::Model>> {
    Ok(subscription_plan::Entity::find()
        .filter(subscription_plan::Column::IsActive.eq(true))
        .order_by_asc(subscription_plan::Column::PriceMonthly)
        .all(conn)
        .await?)
}

/// Starts a subscription running `months` from `starts_at`. Any active
/// subscription it replaces is cancelled.
pub async fn subscribe_cafe(
    db: &DatabaseConnection,
    cafe_id: Uuid,
    plan_id: Uuid,
    starts_at: DateTime<Utc>,
    months: u32,
) -> AppResult<cafe_subscription::Model> {
    if months == 0 {
        return Err(AppError::Validation("A subscription lasts at least one month".to_string()));
    }
    let ends_at = starts_at
        .checked_add_months(Months::new(months))
        .ok_or_else(|| AppError::Validation("Subscription end is out of range".to_string()))?;

    let txn = db.begin().await?;
    find_cafe(&txn, cafe_id).await?;
    let plan = subscription_plan::Entity::find_by_id(plan_id)
        .one(&txn)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;

    cafe_subscription::Entity::update_many()
        .col_expr(
            cafe_subscription::Column::Status,
            Expr::value(SubscriptionStatus::Cancelled),
        )
        .filter(cafe_subscription::Column::CafeId.eq(cafe_id))
        .filter(cafe_subscription::Column::Status.eq(SubscriptionStatus::Active))
        .exec(&txn)
        .await?;

    let subscription = cafe_subscription::ActiveModel {
        id: Set(Uuid::new_v4()),
        cafe_id: Set(cafe_id),
        plan_id: Set(plan.id),
        status: Set(SubscriptionStatus::Active),
        starts_at: Set(starts_at.into()),
        ends_at: Set(ends_at.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(cafe_id = %cafe_id, plan = %plan.slug, ends_at = %ends_at, "Café subscribed");
    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_are_trimmed() {
        assert_eq!(required("  Corner Café ", "Name").unwrap(), "Corner Café");
        assert!(matches!(required("   ", "Name"), Err(AppError::Validation(_))));
    }
}
