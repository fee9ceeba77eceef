mod common;

use chrono::Duration;
use uuid::Uuid;

use common::*;
use matchday_booking::entities::cafe_subscription::SubscriptionStatus;
use matchday_booking::error::AppError;
use matchday_booking::gateways::MockPaymentGateway;
use matchday_booking::services::admission::{check_admission, evaluate_admission, ResourceKind};
use matchday_booking::services::booking::{cancel_booking, create_booking, CancelActor, NewBooking};
use matchday_booking::services::cafes::{
    self, add_staff_member, create_offer, NewBranch, NewOffer, NewPlan,
};
use matchday_booking::services::matches::create_match;

fn branch_named(name: &str) -> NewBranch {
    NewBranch {
        name: name.to_string(),
        address: None,
        total_capacity: 40,
    }
}

#[tokio::test]
async fn test_branch_limit_blocks_creation() {
    let db = setup_db().await;
    let plan = create_plan(
        &db,
        "starter",
        NewPlan {
            max_branches: Some(1),
            ..Default::default()
        },
    )
    .await;
    let cafe = subscribed_cafe(&db, "Corner Café", &plan).await;

    cafes::create_branch(&db, cafe.id, branch_named("Downtown"), now()).await.unwrap();

    let verdict = check_admission(&db, cafe.id, ResourceKind::Branch, now()).await;
    assert!(!verdict.allowed);
    assert_eq!(verdict.limit, Some(1));
    assert_eq!(verdict.current, Some(1));
    assert_eq!(verdict.plan.as_deref(), Some("STARTER"));

    let err = cafes::create_branch(&db, cafe.id, branch_named("Uptown"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PlanLimit(_)));
}

#[tokio::test]
async fn test_unbounded_resources_are_always_admitted() {
    let db = setup_db().await;
    let plan = create_plan(&db, "pro", NewPlan::default()).await;
    let cafe = subscribed_cafe(&db, "Corner Café", &plan).await;

    for name in ["One", "Two", "Three"] {
        cafes::create_branch(&db, cafe.id, branch_named(name), now()).await.unwrap();
    }

    let verdict = check_admission(&db, cafe.id, ResourceKind::Branch, now()).await;
    assert!(verdict.allowed);
    assert_eq!(verdict.limit, None);
    assert_eq!(verdict.current, None);
}

#[tokio::test]
async fn test_cafe_without_subscription_is_blocked() {
    let db = setup_db().await;
    let cafe = cafes::create_cafe(&db, "Lonely Café", Uuid::new_v4()).await.unwrap();

    let verdict = check_admission(&db, cafe.id, ResourceKind::Branch, now()).await;
    assert!(!verdict.allowed);
    assert_eq!(verdict.reason.as_deref(), Some("No active subscription"));

    let err = cafes::create_branch(&db, cafe.id, branch_named("Downtown"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PlanLimit(_)));
}

#[tokio::test]
async fn test_lapsed_subscription_grace_period() {
    let db = setup_db().await;
    let plan = create_plan(&db, "basic", NewPlan::default()).await;
    let recent = cafes::create_cafe(&db, "Recently Lapsed", Uuid::new_v4()).await.unwrap();
    let stale = cafes::create_cafe(&db, "Long Lapsed", Uuid::new_v4()).await.unwrap();

    insert_subscription(
        &db,
        recent.id,
        plan.id,
        SubscriptionStatus::Expired,
        now() - Duration::days(33),
        now() - Duration::days(3),
    )
    .await;
    insert_subscription(
        &db,
        stale.id,
        plan.id,
        SubscriptionStatus::Expired,
        now() - Duration::days(38),
        now() - Duration::days(8),
    )
    .await;

    let verdict = evaluate_admission(&db, recent.id, ResourceKind::Branch, now()).await.unwrap();
    assert!(verdict.allowed);
    assert!(verdict.in_grace_period);
    cafes::create_branch(&db, recent.id, branch_named("Downtown"), now()).await.unwrap();

    let verdict = evaluate_admission(&db, stale.id, ResourceKind::Branch, now()).await.unwrap();
    assert!(!verdict.allowed);
    let err = cafes::create_branch(&db, stale.id, branch_named("Downtown"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PlanLimit(_)));
}

#[tokio::test]
async fn test_new_subscription_replaces_the_active_one() {
    let db = setup_db().await;
    let small = create_plan(
        &db,
        "small",
        NewPlan {
            max_branches: Some(1),
            ..Default::default()
        },
    )
    .await;
    let large = create_plan(
        &db,
        "large",
        NewPlan {
            max_branches: Some(5),
            ..Default::default()
        },
    )
    .await;
    let cafe = subscribed_cafe(&db, "Growing Café", &small).await;
    cafes::create_branch(&db, cafe.id, branch_named("One"), now()).await.unwrap();

    cafes::subscribe_cafe(&db, cafe.id, large.id, now() - Duration::hours(1), 12)
        .await
        .unwrap();

    let verdict = check_admission(&db, cafe.id, ResourceKind::Branch, now()).await;
    assert!(verdict.allowed);
    assert_eq!(verdict.limit, Some(5));
    cafes::create_branch(&db, cafe.id, branch_named("Two"), now()).await.unwrap();
}

#[tokio::test]
async fn test_monthly_booking_quota() {
    let db = setup_db().await;
    let plan = create_plan(
        &db,
        "taster",
        NewPlan {
            max_bookings_per_month: Some(1),
            ..Default::default()
        },
    )
    .await;
    let venue = setup_venue_on(&db, plan).await;
    let game = published_match(&db, &venue, 2).await;

    let first_user = Uuid::new_v4();
    let first = book(&db, first_user, game.id, venue.hall_seats(1)).await;

    let err = create_booking(
        &db,
        &rules(),
        Uuid::new_v4(),
        NewBooking {
            match_id: game.id,
            seat_ids: vec![venue.hall.seats[4].id],
            guests_count: None,
            special_requests: None,
        },
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::PlanLimit(_)));
    assert_eq!(reload_match(&db, game.id).await.seats_available, 13);
    assert!(reload_seat(&db, venue.hall.seats[4].id).await.is_available);

    // Cancelled bookings still count against the month.
    cancel_booking(
        &db,
        &MockPaymentGateway,
        first.details.booking.id,
        CancelActor::Customer(first_user),
        None,
        now(),
    )
    .await
    .unwrap();
    let verdict = check_admission(&db, venue.cafe.id, ResourceKind::Booking, now()).await;
    assert!(!verdict.allowed);

    // A new month resets the meter.
    let next_month = now() + Duration::days(31);
    let verdict = check_admission(&db, venue.cafe.id, ResourceKind::Booking, next_month).await;
    assert_eq!(verdict.current, Some(0));
}

#[tokio::test]
async fn test_monthly_match_quota() {
    let db = setup_db().await;
    let plan = create_plan(
        &db,
        "weekend",
        NewPlan {
            max_matches_per_month: Some(2),
            ..Default::default()
        },
    )
    .await;
    let venue = setup_venue_on(&db, plan).await;

    create_match(&db, &rules(), new_match(&venue, 1), now()).await.unwrap();
    create_match(&db, &rules(), new_match(&venue, 2), now()).await.unwrap();
    let err = create_match(&db, &rules(), new_match(&venue, 3), now()).await.unwrap_err();
    assert!(matches!(err, AppError::PlanLimit(_)));
}

#[tokio::test]
async fn test_staff_and_offer_limits() {
    let db = setup_db().await;
    let plan = create_plan(
        &db,
        "team",
        NewPlan {
            max_staff: Some(1),
            max_offers: Some(0),
            ..Default::default()
        },
    )
    .await;
    let venue = setup_venue_on(&db, plan).await;

    add_staff_member(&db, venue.cafe.id, Uuid::new_v4(), Some(venue.branch.id), "waiter", now())
        .await
        .unwrap();
    let err = add_staff_member(&db, venue.cafe.id, Uuid::new_v4(), None, "host", now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PlanLimit(_)));

    let err = create_offer(
        &db,
        venue.cafe.id,
        NewOffer {
            branch_id: None,
            title: "Derby night".to_string(),
            description: None,
            discount_percent: 15.0,
            starts_at: now(),
            ends_at: now() + Duration::days(1),
        },
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::PlanLimit(_)));
}
