mod common;

use uuid::Uuid;

use common::*;
use matchday_booking::entities::seating_section::SectionType;
use matchday_booking::error::{AppError, ConflictKind};
use matchday_booking::gateways::MockPaymentGateway;
use matchday_booking::services::booking::{cancel_booking, create_booking, CancelActor, NewBooking};
use matchday_booking::services::seats::{
    delete_seat, list_branch_seats, resize_section, set_seat_blocked, update_section,
    SectionChanges,
};

fn labels(seats: &[matchday_booking::entities::seat::Model]) -> Vec<String> {
    seats.iter().map(|s| s.label.clone()).collect()
}

#[tokio::test]
async fn test_sections_generate_labelled_seats() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;

    assert_eq!(labels(&venue.hall.seats), (1..=10).map(|n| format!("S{}", n)).collect::<Vec<_>>());
    assert_eq!(labels(&venue.lounge.seats), vec!["V1", "V2", "V3", "V4"]);
    assert!(venue.hall.seats.iter().all(|s| s.is_available));

    let terrace = create_section(&db, venue.branch.id, "terrace", SectionType::Custom, 2, 10.0).await;
    assert_eq!(labels(&terrace.seats), vec!["T1", "T2"]);

    let sections = list_branch_seats(&db, venue.branch.id).await.unwrap();
    let total: usize = sections.iter().map(|s| s.seats.len()).sum();
    assert_eq!(sections.len(), 3);
    assert_eq!(total, 16);
}

#[tokio::test]
async fn test_section_validation() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;

    let err = matchday_booking::services::seats::create_section(
        &db,
        venue.branch.id,
        matchday_booking::services::seats::NewSection {
            name: "Huge".to_string(),
            section_type: SectionType::Standard,
            total_seats: 501,
            extra_cost: 0.0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = matchday_booking::services::seats::create_section(
        &db,
        Uuid::new_v4(),
        matchday_booking::services::seats::NewSection {
            name: "Nowhere".to_string(),
            section_type: SectionType::Standard,
            total_seats: 1,
            extra_cost: 0.0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_resize_appends_and_drops_highest_seats() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;

    let grown = resize_section(&db, venue.hall.section.id, 12).await.unwrap();
    assert_eq!(grown.added, 2);
    assert_eq!(grown.section.section.total_seats, 12);
    assert_eq!(labels(&grown.section.seats[10..]), vec!["S11", "S12"]);

    let shrunk = resize_section(&db, venue.hall.section.id, 8).await.unwrap();
    assert_eq!(shrunk.removed, 4);
    assert_eq!(shrunk.section.seats.len(), 8);
    assert_eq!(shrunk.section.seats.last().unwrap().label, "S8");
}

#[tokio::test]
async fn test_held_seats_cannot_be_removed() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let user = Uuid::new_v4();
    let last_seat = venue.hall.seats[9].id;
    let booking = book(&db, user, game.id, vec![last_seat]).await.details.booking;

    let err = resize_section(&db, venue.hall.section.id, 9).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SeatInUse, _)));
    let err = delete_seat(&db, last_seat).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SeatInUse, _)));
    let err = set_seat_blocked(&db, last_seat, true).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SeatInUse, _)));

    cancel_booking(&db, &MockPaymentGateway, booking.id, CancelActor::Customer(user), None, now())
        .await
        .unwrap();

    let shrunk = resize_section(&db, venue.hall.section.id, 9).await.unwrap();
    assert_eq!(shrunk.removed, 1);
    delete_seat(&db, venue.hall.seats[8].id).await.unwrap();
    let sections = list_branch_seats(&db, venue.branch.id).await.unwrap();
    let hall = sections.iter().find(|s| s.section.id == venue.hall.section.id).unwrap();
    assert_eq!(hall.section.total_seats, 8);
    assert_eq!(hall.seats.len(), 8);
}

#[tokio::test]
async fn test_blocked_seat_cannot_be_booked() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;
    let game = published_match(&db, &venue, 2).await;
    let seat_id = venue.hall.seats[0].id;

    let blocked = set_seat_blocked(&db, seat_id, true).await.unwrap();
    assert!(!blocked.is_available);

    let err = create_booking(
        &db,
        &rules(),
        Uuid::new_v4(),
        NewBooking {
            match_id: game.id,
            seat_ids: vec![seat_id],
            guests_count: None,
            special_requests: None,
        },
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SeatUnavailable, _)));

    set_seat_blocked(&db, seat_id, false).await.unwrap();
    book(&db, Uuid::new_v4(), game.id, vec![seat_id]).await;
}

#[tokio::test]
async fn test_retyping_a_section_relabels_its_seats() {
    let db = setup_db().await;
    let venue = setup_venue(&db).await;

    let updated = update_section(
        &db,
        venue.lounge.section.id,
        SectionChanges {
            section_type: Some(SectionType::Premium),
            extra_cost: Some(40.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(labels(&updated.seats), vec!["P1", "P2", "P3", "P4"]);
    assert_eq!(updated.section.extra_cost, 40.0);

    // Renaming a typed section keeps its prefix.
    let renamed = update_section(
        &db,
        venue.hall.section.id,
        SectionChanges {
            name: Some("Big Screen Hall".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.section.name, "Big Screen Hall");
    assert_eq!(renamed.seats[0].label, "S1");
}
