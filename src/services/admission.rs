//! Subscription admission gate.
//!
//! Every resource a café creates (branches, matches, bookings, staff,
//! offers) is checked against the ceiling of its effective plan.

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cafe_subscription::{self, SubscriptionStatus};
use crate::entities::{booking, branch, matches, offer, staff_member, subscription_plan};
use crate::error::{AppError, AppResult};

/// Days a lapsed subscription keeps admitting resources.
pub const GRACE_PERIOD_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Branch,
    Match,
    Booking,
    Staff,
    Offer,
}

impl ResourceKind {
    pub fn limit(self, plan: &subscription_plan::Model) -> Option<i32> {
        match self {
            ResourceKind::Branch => plan.max_branches,
            ResourceKind::Match => plan.max_matches_per_month,
            ResourceKind::Booking => plan.max_bookings_per_month,
            ResourceKind::Staff => plan.max_staff,
            ResourceKind::Offer => plan.max_offers,
        }
    }

    /// Matches and bookings are metered per calendar month.
    pub fn is_monthly(self) -> bool {
        matches!(self, ResourceKind::Match | ResourceKind::Booking)
    }

    fn label(self) -> &'static str {
        match self {
            ResourceKind::Branch => "branches",
            ResourceKind::Match => "matches per month",
            ResourceKind::Booking => "bookings per month",
            ResourceKind::Staff => "staff members",
            ResourceKind::Offer => "offers",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
    pub limit: Option<i32>,
    pub current: Option<u64>,
    pub plan: Option<String>,
    pub in_grace_period: bool,
}

impl AdmissionVerdict {
    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            limit: None,
            current: None,
            plan: None,
            in_grace_period: false,
        }
    }
}

/// The plan a café is currently governed by.
#[derive(Debug, Clone)]
pub struct EffectivePlan {
    pub plan: subscription_plan::Model,
    pub subscription: cafe_subscription::Model,
    pub in_grace_period: bool,
}

/// Picks the subscription that governs `now`: an active, unexpired one wins;
/// otherwise the most recently lapsed one still inside the grace period.
pub fn select_subscription(
    subscriptions: &[cafe_subscription::Model],
    now: DateTime<Utc>,
) -> Option<(&cafe_subscription::Model, bool)> {
    let current = subscriptions
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Active)
        .filter(|s| s.starts_at.with_timezone(&Utc) <= now && s.ends_at.with_timezone(&Utc) > now)
        .max_by_key(|s| s.ends_at);
    if let Some(subscription) = current {
        return Some((subscription, false));
    }

    subscriptions
        .iter()
        .filter(|s| s.status != SubscriptionStatus::Cancelled)
        .filter(|s| s.ends_at.with_timezone(&Utc) <= now)
        .max_by_key(|s| s.ends_at)
        .filter(|s| now - s.ends_at.with_timezone(&Utc) <= Duration::days(GRACE_PERIOD_DAYS))
        .map(|s| (s, true))
}

pub async fn resolve_effective_plan<C: ConnectionTrait>(
    conn: &C,
    cafe_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Option<EffectivePlan>> {
    let subscriptions = cafe_subscription::Entity::find()
        .filter(cafe_subscription::Column::CafeId.eq(cafe_id))
        .all(conn)
        .await?;

    let Some((subscription, in_grace_period)) = select_subscription(&subscriptions, now) else {
        return Ok(None);
    };

    let plan = subscription_plan::Entity::find_by_id(subscription.plan_id)
        .one(conn)
        .await?;

    Ok(plan.map(|plan| EffectivePlan {
        plan,
        subscription: subscription.clone(),
        in_grace_period,
    }))
}

/// First instant of the month containing `now` and of the month after it.
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap_or(today);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
    (
        first.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    )
}

/// How many of `kind` the café already has in the metering window.
pub async fn current_usage<C: ConnectionTrait>(
    conn: &C,
    cafe_id: Uuid,
    kind: ResourceKind,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let count = match kind {
        ResourceKind::Branch => {
            branch::Entity::find()
                .filter(branch::Column::CafeId.eq(cafe_id))
                .count(conn)
                .await?
        }
        ResourceKind::Staff => {
            staff_member::Entity::find()
                .filter(staff_member::Column::CafeId.eq(cafe_id))
                .count(conn)
                .await?
        }
        ResourceKind::Offer => {
            offer::Entity::find()
                .filter(offer::Column::CafeId.eq(cafe_id))
                .count(conn)
                .await?
        }
        ResourceKind::Match | ResourceKind::Booking => {
            let branch_ids: Vec<Uuid> = branch::Entity::find()
                .filter(branch::Column::CafeId.eq(cafe_id))
                .all(conn)
                .await?
                .into_iter()
                .map(|b| b.id)
                .collect();
            if branch_ids.is_empty() {
                return Ok(0);
            }

            let (start, end) = month_bounds(now);
            if kind == ResourceKind::Match {
                matches::Entity::find()
                    .filter(matches::Column::BranchId.is_in(branch_ids))
                    .filter(matches::Column::CreatedAt.gte(start.fixed_offset()))
                    .filter(matches::Column::CreatedAt.lt(end.fixed_offset()))
                    .count(conn)
                    .await?
            } else {
                booking::Entity::find()
                    .filter(booking::Column::BranchId.is_in(branch_ids))
                    .filter(booking::Column::CreatedAt.gte(start.fixed_offset()))
                    .filter(booking::Column::CreatedAt.lt(end.fixed_offset()))
                    .count(conn)
                    .await?
            }
        }
    };
    Ok(count)
}

/// Pure decision: a `None` ceiling admits anything, otherwise the café must
/// still be below it.
pub fn evaluate(
    effective: Option<&EffectivePlan>,
    kind: ResourceKind,
    current: Option<u64>,
) -> AdmissionVerdict {
    let Some(effective) = effective else {
        return AdmissionVerdict::blocked("No active subscription");
    };

    let limit = kind.limit(&effective.plan);
    let mut verdict = AdmissionVerdict {
        allowed: true,
        reason: None,
        limit,
        current,
        plan: Some(effective.plan.name.clone()),
        in_grace_period: effective.in_grace_period,
    };

    if let Some(limit) = limit {
        let used = current.unwrap_or(0);
        if used >= u64::try_from(limit.max(0)).unwrap_or(0) {
            verdict.allowed = false;
            verdict.reason = Some(format!(
                "The {} plan allows {} {} and {} are already in use",
                effective.plan.name,
                limit,
                kind.label(),
                used
            ));
        }
    }
    verdict
}

/// Fallible form of the gate, for use inside a creating transaction.
pub async fn evaluate_admission<C: ConnectionTrait>(
    conn: &C,
    cafe_id: Uuid,
    kind: ResourceKind,
    now: DateTime<Utc>,
) -> AppResult<AdmissionVerdict> {
    let effective = resolve_effective_plan(conn, cafe_id, now).await?;
    let bounded = effective
        .as_ref()
        .is_some_and(|e| kind.limit(&e.plan).is_some());
    let current = if bounded {
        Some(current_usage(conn, cafe_id, kind, now).await?)
    } else {
        None
    };
    Ok(evaluate(effective.as_ref(), kind, current))
}

/// Read-only admission query. Lookup failures come back as a blocked verdict.
pub async fn check_admission<C: ConnectionTrait>(
    conn: &C,
    cafe_id: Uuid,
    kind: ResourceKind,
    now: DateTime<Utc>,
) -> AdmissionVerdict {
    match evaluate_admission(conn, cafe_id, kind, now).await {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::error!(error = %e, cafe_id = %cafe_id, kind = ?kind, "Admission check failed");
            AdmissionVerdict::blocked("Admission could not be verified")
        }
    }
}

/// Fails with `PlanLimit` unless the café may create one more `kind`.
pub async fn ensure_admitted<C: ConnectionTrait>(
    conn: &C,
    cafe_id: Uuid,
    kind: ResourceKind,
    now: DateTime<Utc>,
) -> AppResult<AdmissionVerdict> {
    let verdict = evaluate_admission(conn, cafe_id, kind, now).await?;
    if !verdict.allowed {
        tracing::info!(cafe_id = %cafe_id, kind = ?kind, reason = ?verdict.reason, "Admission denied");
        return Err(AppError::PlanLimit(
            verdict
                .reason
                .clone()
                .unwrap_or_else(|| "Plan limit reached".to_string()),
        ));
    }
    if verdict.in_grace_period {
        tracing::warn!(cafe_id = %cafe_id, kind = ?kind, "Admitting during subscription grace period");
    }
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan(max_bookings: Option<i32>) -> subscription_plan::Model {
        subscription_plan::Model {
            id: Uuid::new_v4(),
            name: "Starter".to_string(),
            slug: "starter".to_string(),
            price_monthly: 199.0,
            max_branches: Some(1),
            max_matches_per_month: Some(10),
            max_bookings_per_month: max_bookings,
            max_staff: Some(3),
            max_offers: None,
            has_analytics: false,
            has_loyalty: true,
            has_custom_branding: false,
            is_active: true,
            created_at: Utc::now().into(),
        }
    }

    fn subscription(
        status: SubscriptionStatus,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> cafe_subscription::Model {
        cafe_subscription::Model {
            id: Uuid::new_v4(),
            cafe_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status,
            starts_at: starts_at.into(),
            ends_at: ends_at.into(),
            created_at: starts_at.into(),
        }
    }

    fn effective(plan: subscription_plan::Model) -> EffectivePlan {
        let now = Utc::now();
        EffectivePlan {
            plan,
            subscription: subscription(
                SubscriptionStatus::Active,
                now - Duration::days(1),
                now + Duration::days(29),
            ),
            in_grace_period: false,
        }
    }

    #[test]
    fn blocks_at_the_ceiling() {
        let plan = effective(plan(Some(100)));
        assert!(evaluate(Some(&plan), ResourceKind::Booking, Some(99)).allowed);

        let verdict = evaluate(Some(&plan), ResourceKind::Booking, Some(100));
        assert!(!verdict.allowed);
        assert_eq!(verdict.limit, Some(100));
        assert_eq!(verdict.current, Some(100));
        assert!(verdict.reason.unwrap().contains("100"));
    }

    #[test]
    fn unbounded_resources_are_always_admitted() {
        let plan = effective(plan(None));
        for used in [0, 1, 10_000] {
            let verdict = evaluate(Some(&plan), ResourceKind::Booking, Some(used));
            assert!(verdict.allowed);
            assert_eq!(verdict.limit, None);
        }
        assert!(evaluate(Some(&plan), ResourceKind::Offer, None).allowed);
    }

    #[test]
    fn no_plan_means_blocked() {
        let verdict = evaluate(None, ResourceKind::Branch, None);
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason.as_deref(), Some("No active subscription"));
    }

    #[test]
    fn lapsed_subscription_admits_within_grace() {
        let now = Utc::now();
        let lapsed = subscription(
            SubscriptionStatus::Active,
            now - Duration::days(33),
            now - Duration::days(3),
        );
        let subs = vec![lapsed.clone()];
        let (picked, grace) = select_subscription(&subs, now).unwrap();
        assert_eq!(picked.id, lapsed.id);
        assert!(grace);

        let stale = vec![subscription(
            SubscriptionStatus::Expired,
            now - Duration::days(38),
            now - Duration::days(8),
        )];
        assert!(select_subscription(&stale, now).is_none());
    }

    #[test]
    fn current_subscription_beats_lapsed_one() {
        let now = Utc::now();
        let lapsed = subscription(
            SubscriptionStatus::Expired,
            now - Duration::days(40),
            now - Duration::days(2),
        );
        let current = subscription(
            SubscriptionStatus::Active,
            now - Duration::days(2),
            now + Duration::days(28),
        );
        let subs = vec![lapsed, current.clone()];
        let (picked, grace) = select_subscription(&subs, now).unwrap();
        assert_eq!(picked.id, current.id);
        assert!(!grace);
    }

    #[test]
    fn cancelled_subscriptions_get_no_grace() {
        let now = Utc::now();
        let subs = vec![subscription(
            SubscriptionStatus::Cancelled,
            now - Duration::days(30),
            now - Duration::days(1),
        )];
        assert!(select_subscription(&subs, now).is_none());
    }

    #[test]
    fn month_bounds_cover_the_calendar_month() {
        let now = Utc.with_ymd_and_hms(2026, 12, 19, 15, 30, 0).unwrap();
        let (start, end) = month_bounds(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }
}
