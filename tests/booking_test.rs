mod common;

use chrono::Duration;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::*;
use matchday_booking::entities::booking::BookingStatus;
use matchday_booking::entities::loyalty_card;
use matchday_booking::entities::payment::PaymentStatus;
use matchday_booking::error::{AppError, ConflictKind};
use matchday_booking::gateways::MockPaymentGateway;
use matchday_booking::services::booking::{
    cancel_booking, capture_payment, create_booking, expire_stale_payments, get_booking_details,
    list_user_bookings, CancelActor, NewBooking,
};
use matchday_booking::services::checkin::scan;
use matchday_booking::services::events::DomainEvent;
use matchday_booking::services::matches::{create_match, override_seats_available};
use matchday_booking::utils::codes::{is_booking_code, QrPayload};

fn request(match_id: Uuid, seat_ids: Vec<Uuid>) -> NewBooking {
    NewBooking {
        match_id,
        seat_ids,
        guests_count: None,
        special_requests: None,
    }
}

async fn points_of(db: &sea_orm::DatabaseConnection, user_id: Uuid) -> i32 {
    loyalty_card::Entity::find()
        .filter(loyalty_card::Column::UserId.eq(user_id))
        .one(db)
        .await
        .unwrap()
        .map(|card| card.points)
        .unwrap_or(0)
}

#[tokio::test]
async fn test_booking_prices_seats_and_claims_inventory() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    assert_eq!(game.total_seats, 14);
    let user = Uuid::new_v4();

    let outcome = book(&db, user, game.id, venue.hall_seats(3)).await;

    assert_eq!(outcome.cost.subtotal, 150.0);
    assert_eq!(outcome.cost.service_fee, 7.5);
    assert_eq!(outcome.cost.total, 157.5);

    let booking = &outcome.details.booking;
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.guests_count, 3);
    assert_eq!(booking.total_amount, 157.5);
    assert_eq!(booking.currency, "EGP");
    assert!(is_booking_code(&booking.code));

    let payload = QrPayload::decode(&booking.qr_payload).expect("QR payload is JSON");
    assert_eq!(payload.booking_id, booking.id);
    assert_eq!(payload.code, booking.code);

    let labels: Vec<&str> = outcome.details.seats.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["S1", "S2", "S3"]);

    assert_eq!(reload_match(&db, game.id).await.seats_available, 11);
    for seat_id in venue.hall_seats(3) {
        assert!(!reload_seat(&db, seat_id).await.is_available);
    }

    let payment = outcome.details.payment.as_ref().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 157.5);

    assert_eq!(points_of(&db, user).await, 10);
    assert!(matches!(
        outcome.events.as_slice(),
        [DomainEvent::BookingConfirmed { seats: 3, .. }]
    ));
}

#[tokio::test]
async fn test_section_surcharge_and_minimum_fee() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;

    let outcome = book(&db, Uuid::new_v4(), game.id, venue.lounge_seats(1)).await;

    // 50 + 25 surcharge; 5% of 75 is below the floor.
    assert_eq!(outcome.cost.subtotal, 75.0);
    assert_eq!(outcome.cost.service_fee, 5.0);
    assert_eq!(outcome.cost.total, 80.0);
    assert_eq!(outcome.details.seats[0].price, 75.0);
    assert_eq!(outcome.details.seats[0].section, "Lounge");
}

#[tokio::test]
async fn test_second_booking_for_same_match_is_rejected() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();

    book(&db, user, game.id, venue.hall_seats(1)).await;

    let err = create_booking(&db, &rules(), user, request(game.id, vec![venue.hall.seats[5].id]), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::DuplicateBooking, _)));
    assert_eq!(reload_match(&db, game.id).await.seats_available, 13);
}

#[tokio::test]
async fn test_taken_seat_leaves_inventory_untouched() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;

    book(&db, Uuid::new_v4(), game.id, venue.hall_seats(2)).await;

    // Second seat is free, first is already taken: nothing may be claimed.
    let seats = vec![venue.hall.seats[2].id, venue.hall.seats[1].id];
    let err = create_booking(&db, &rules(), Uuid::new_v4(), request(game.id, seats), now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(ConflictKind::SeatUnavailable, _)));
    assert!(reload_seat(&db, venue.hall.seats[2].id).await.is_available);
    assert_eq!(reload_match(&db, game.id).await.seats_available, 12);
}

#[tokio::test]
async fn test_sold_out_match_rejects_booking() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;

    override_seats_available(&db, game.id, 1).await.unwrap();

    let err = create_booking(&db, &rules(), Uuid::new_v4(), request(game.id, venue.hall_seats(2)), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SeatUnavailable, _)));
    assert!(reload_seat(&db, venue.hall.seats[0].id).await.is_available);
}

#[tokio::test]
async fn test_booking_requires_an_open_window() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;

    let draft = create_match(&db, &rules(), new_match(&venue, 2), now()).await.unwrap();
    let err = create_booking(&db, &rules(), Uuid::new_v4(), request(draft.id, venue.hall_seats(1)), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let mut closed = new_match(&venue, 3);
    closed.booking_opens_at = Some(now() - Duration::days(2));
    closed.booking_closes_at = Some(now() - Duration::hours(1));
    let closed = create_match(&db, &rules(), closed, now()).await.unwrap();
    matchday_booking::services::matches::publish_match(&db, closed.id).await.unwrap();

    let err = create_booking(&db, &rules(), Uuid::new_v4(), request(closed.id, venue.hall_seats(1)), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = create_booking(&db, &rules(), Uuid::new_v4(), request(Uuid::new_v4(), venue.hall_seats(1)), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_seats_must_belong_to_the_match_branch() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;

    let elsewhere = create_branch(&db, venue.cafe.id, "Uptown").await;
    let foreign = create_section(
        &db,
        elsewhere.id,
        "Garden",
        matchday_booking::entities::seating_section::SectionType::Outdoor,
        2,
        0.0,
    )
    .await;

    let err = create_booking(
        &db,
        &rules(),
        Uuid::new_v4(),
        request(game.id, vec![foreign.seats[0].id]),
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(reload_match(&db, game.id).await.seats_available, 14);
}

#[tokio::test]
async fn test_cancellation_restores_seats_and_points() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();
    let booked = book(&db, user, game.id, venue.hall_seats(3)).await;
    let gateway = MockPaymentGateway;

    let outcome = cancel_booking(
        &db,
        &gateway,
        booked.details.booking.id,
        CancelActor::Customer(user),
        Some("Plans changed".to_string()),
        now(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    assert_eq!(outcome.booking.cancellation_reason.as_deref(), Some("Plans changed"));
    assert_eq!(outcome.seats_released, 3);
    assert!(!outcome.refunded);

    assert_eq!(reload_match(&db, game.id).await.seats_available, 14);
    for seat_id in venue.hall_seats(3) {
        assert!(reload_seat(&db, seat_id).await.is_available);
    }
    assert_eq!(points_of(&db, user).await, 0);
    assert_eq!(
        payment_for(&db, booked.details.booking.id).await.status,
        PaymentStatus::Cancelled
    );

    let details = get_booking_details(&db, booked.details.booking.id).await.unwrap();
    assert!(details.seats.iter().all(|s| s.released));

    // The same seats can be booked again, by the same user too.
    book(&db, user, game.id, venue.hall_seats(3)).await;
    assert_eq!(reload_match(&db, game.id).await.seats_available, 11);
}

#[tokio::test]
async fn test_cancellation_rules() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();
    let booked = book(&db, user, game.id, venue.hall_seats(1)).await;
    let booking_id = booked.details.booking.id;
    let gateway = MockPaymentGateway;

    let err = cancel_booking(&db, &gateway, booking_id, CancelActor::Customer(Uuid::new_v4()), None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let after_kick_off = game.starts_at() + Duration::minutes(5);
    let err = cancel_booking(&db, &gateway, booking_id, CancelActor::Customer(user), None, after_kick_off)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Venue staff are not bound by kick-off.
    cancel_booking(&db, &gateway, booking_id, CancelActor::Venue, None, after_kick_off)
        .await
        .unwrap();

    let err = cancel_booking(&db, &gateway, booking_id, CancelActor::Venue, None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyTerminal, _)));
    assert_eq!(reload_match(&db, game.id).await.seats_available, 14);
}

#[tokio::test]
async fn test_paid_booking_is_refunded_on_cancel() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();
    let booked = book(&db, user, game.id, venue.hall_seats(2)).await;
    let booking_id = booked.details.booking.id;
    let gateway = ScriptedGateway::default();

    let paid = capture_payment(&db, &gateway, booking_id, user, "card", now()).await.unwrap();
    assert_eq!(paid.payment.status, PaymentStatus::Paid);
    assert_eq!(paid.payment.method.as_deref(), Some("card"));
    assert!(matches!(paid.events.as_slice(), [DomainEvent::PaymentCaptured { .. }]));

    let err = capture_payment(&db, &gateway, booking_id, user, "card", now()).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::InvalidStatus, _)));

    let outcome = cancel_booking(&db, &gateway, booking_id, CancelActor::Customer(user), None, now())
        .await
        .unwrap();
    assert!(outcome.refunded);
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, DomainEvent::PaymentRefunded { .. })));
    assert_eq!(gateway.refunds.lock().unwrap().len(), 1);

    let payment = payment_for(&db, booking_id).await;
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert!(payment.refunded_at.is_some());
}

#[tokio::test]
async fn test_failed_refund_keeps_cancellation() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();
    let booked = book(&db, user, game.id, venue.hall_seats(1)).await;
    let booking_id = booked.details.booking.id;
    let gateway = ScriptedGateway {
        refunds_down: true,
        ..Default::default()
    };

    capture_payment(&db, &gateway, booking_id, user, "wallet", now()).await.unwrap();
    let outcome = cancel_booking(&db, &gateway, booking_id, CancelActor::Customer(user), None, now())
        .await
        .unwrap();

    assert!(!outcome.refunded);
    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    assert_eq!(payment_for(&db, booking_id).await.status, PaymentStatus::Paid);
    assert_eq!(reload_match(&db, game.id).await.seats_available, 14);
}

#[tokio::test]
async fn test_declined_charge_can_be_retried() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();
    let booking_id = book(&db, user, game.id, venue.hall_seats(1)).await.details.booking.id;

    let declining = ScriptedGateway {
        decline_charges: true,
        ..Default::default()
    };
    let declined = capture_payment(&db, &declining, booking_id, user, "card", now()).await.unwrap();
    assert_eq!(declined.payment.status, PaymentStatus::Failed);
    assert!(declined.events.is_empty());

    let err = capture_payment(&db, &declining, booking_id, Uuid::new_v4(), "card", now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let paid = capture_payment(&db, &ScriptedGateway::default(), booking_id, user, "card", now())
        .await
        .unwrap();
    assert_eq!(paid.payment.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_unpaid_bookings_expire() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let gateway = MockPaymentGateway;

    let payer = Uuid::new_v4();
    let paid = book(&db, payer, game.id, venue.hall_seats(1)).await.details.booking.id;
    capture_payment(&db, &gateway, paid, payer, "card", now()).await.unwrap();
    let unpaid = book(&db, Uuid::new_v4(), game.id, venue.lounge_seats(2)).await.details.booking.id;
    // Arrived and scanned in, but never paid online.
    let seated = book(&db, Uuid::new_v4(), game.id, vec![venue.hall.seats[3].id, venue.hall.seats[4].id])
        .await
        .details
        .booking;
    scan(&db, &seated.code, venue.cafe.id, Uuid::new_v4(), now()).await.unwrap();

    let later = now() + Duration::minutes(45);
    let cutoff = later - Duration::minutes(30);
    let outcome = expire_stale_payments(&db, &gateway, cutoff, later).await.unwrap();

    assert_eq!(outcome.cancelled, vec![unpaid]);
    assert_eq!(get_booking_details(&db, unpaid).await.unwrap().booking.status, BookingStatus::Cancelled);
    assert_eq!(get_booking_details(&db, paid).await.unwrap().booking.status, BookingStatus::Confirmed);
    let seated_after = get_booking_details(&db, seated.id).await.unwrap();
    assert_eq!(seated_after.booking.status, BookingStatus::CheckedIn);
    assert!(seated_after.seats.iter().all(|s| !s.released));
    assert_eq!(payment_for(&db, seated.id).await.status, PaymentStatus::Pending);
    assert_eq!(reload_match(&db, game.id).await.seats_available, 11);

    // A second sweep finds nothing left to expire.
    let again = expire_stale_payments(&db, &gateway, cutoff, later).await.unwrap();
    assert!(again.cancelled.is_empty());
    assert_eq!(reload_match(&db, game.id).await.seats_available, 11);
}

#[tokio::test]
async fn test_user_bookings_include_seats() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let first = published_match(&db, &venue, 2).await;
    let second = published_match(&db, &venue, 3).await;
    let user = Uuid::new_v4();

    // Seats are per branch, so the second match uses other seats.
    book(&db, user, first.id, venue.hall_seats(2)).await;
    book(&db, user, second.id, venue.lounge_seats(1)).await;

    let bookings = list_user_bookings(&db, user).await.unwrap();
    assert_eq!(bookings.len(), 2);
    let seat_total: usize = bookings.iter().map(|b| b.seats.len()).sum();
    assert_eq!(seat_total, 3);
    assert!(bookings.iter().all(|b| b.payment.is_some()));
    assert!(list_user_bookings(&db, Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_overlapping_requests_never_share_a_seat() {
    let db = setup_shared_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let seats = &venue.hall.seats;
    let (rules_a, rules_b) = (rules(), rules());

    let (first, second) = tokio::join!(
        create_booking(
            &db,
            &rules_a,
            Uuid::new_v4(),
            request(game.id, vec![seats[0].id, seats[1].id]),
            now(),
        ),
        create_booking(
            &db,
            &rules_b,
            Uuid::new_v4(),
            request(game.id, vec![seats[1].id, seats[2].id]),
            now(),
        ),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SeatUnavailable, _)));

    assert_eq!(reload_match(&db, game.id).await.seats_available, 12);
    assert!(!reload_seat(&db, seats[1].id).await.is_available);
    let free = [seats[0].id, seats[2].id];
    let mut still_free = 0;
    for id in free {
        if reload_seat(&db, id).await.is_available {
            still_free += 1;
        }
    }
    assert_eq!(still_free, 1);
}

#[tokio::test]
async fn test_first_bookings_in_parallel_share_one_loyalty_card() {
    let db = setup_shared_db().await;
    let venue = setup_venue(&db).await;
    let tonight = published_match(&db, &venue, 1).await;
    let tomorrow = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();
    let (rules_a, rules_b) = (rules(), rules());

    let (first, second) = tokio::join!(
        create_booking(&db, &rules_a, user, request(tonight.id, venue.hall_seats(1)), now()),
        create_booking(&db, &rules_b, user, request(tomorrow.id, venue.lounge_seats(1)), now()),
    );
    first.unwrap();
    second.unwrap();

    let cards = loyalty_card::Entity::find()
        .filter(loyalty_card::Column::UserId.eq(user))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].points, 20);
    assert_eq!(cards[0].total_points_earned, 20);
}
