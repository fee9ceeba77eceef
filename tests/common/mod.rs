#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use matchday_booking::config::BookingRules;
use matchday_booking::entities::cafe_subscription::{self, SubscriptionStatus};
use matchday_booking::entities::seating_section::SectionType;
use matchday_booking::entities::{branch, cafe, matches, payment, seat, subscription_plan};
use matchday_booking::gateways::{
    GatewayError, GatewayResponse, NotificationSink, NotifyError, PaymentGateway,
};
use matchday_booking::services::booking::{self, BookingOutcome, NewBooking};
use matchday_booking::services::cafes::{self, NewBranch, NewPlan};
use matchday_booking::services::events::DomainEvent;
use matchday_booking::services::matches::{self as fixtures, NewMatch};
use matchday_booking::services::seats::{self, NewSection, SectionSeats};

/// Fixed clock shared by the integration tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// File-backed database behind a pool of several connections, so
/// transactions from concurrent calls really interleave.
pub async fn setup_shared_db() -> DatabaseConnection {
    let path = std::env::temp_dir().join(format!("matchday-{}.db", Uuid::new_v4()));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(4)
        .min_connections(2)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open database file");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn rules() -> BookingRules {
    BookingRules::default()
}

/// A café with one branch, a hall of 10 standard seats and a VIP lounge of
/// 4 seats costing 25 extra.
pub struct Venue {
    pub cafe: cafe::Model,
    pub branch: branch::Model,
    pub plan: subscription_plan::Model,
    pub hall: SectionSeats,
    pub lounge: SectionSeats,
    pub home_team: i32,
    pub away_team: i32,
}

impl Venue {
    pub fn hall_seats(&self, n: usize) -> Vec<Uuid> {
        self.hall.seats.iter().take(n).map(|s| s.id).collect()
    }

    pub fn lounge_seats(&self, n: usize) -> Vec<Uuid> {
        self.lounge.seats.iter().take(n).map(|s| s.id).collect()
    }
}

pub async fn create_plan(db: &DatabaseConnection, slug: &str, plan: NewPlan) -> subscription_plan::Model {
    cafes::create_plan(
        db,
        NewPlan {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            ..plan
        },
    )
    .await
    .expect("Failed to create plan")
}

/// Inserts a subscription with exact bounds, bypassing `subscribe_cafe`.
pub async fn insert_subscription(
    db: &DatabaseConnection,
    cafe_id: Uuid,
    plan_id: Uuid,
    status: SubscriptionStatus,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> cafe_subscription::Model {
    cafe_subscription::ActiveModel {
        id: Set(Uuid::new_v4()),
        cafe_id: Set(cafe_id),
        plan_id: Set(plan_id),
        status: Set(status),
        starts_at: Set(starts_at.into()),
        ends_at: Set(ends_at.into()),
        created_at: Set(starts_at.into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert subscription")
}

/// A café subscribed to `plan` from yesterday for one month.
pub async fn subscribed_cafe(
    db: &DatabaseConnection,
    name: &str,
    plan: &subscription_plan::Model,
) -> cafe::Model {
    let cafe = cafes::create_cafe(db, name, Uuid::new_v4())
        .await
        .expect("Failed to create café");
    cafes::subscribe_cafe(db, cafe.id, plan.id, now() - Duration::days(1), 1)
        .await
        .expect("Failed to subscribe café");
    cafe
}

pub async fn create_branch(db: &DatabaseConnection, cafe_id: Uuid, name: &str) -> branch::Model {
    cafes::create_branch(
        db,
        cafe_id,
        NewBranch {
            name: name.to_string(),
            address: Some("12 Tahrir Square".to_string()),
            total_capacity: 0,
        },
        now(),
    )
    .await
    .expect("Failed to create branch")
}

pub async fn create_section(
    db: &DatabaseConnection,
    branch_id: Uuid,
    name: &str,
    section_type: SectionType,
    total_seats: i32,
    extra_cost: f64,
) -> SectionSeats {
    seats::create_section(
        db,
        branch_id,
        NewSection {
            name: name.to_string(),
            section_type,
            total_seats,
            extra_cost,
        },
    )
    .await
    .expect("Failed to create section")
}

/// Venue on an unbounded plan.
pub async fn setup_venue(db: &DatabaseConnection) -> Venue {
    let plan = create_plan(db, "unlimited", NewPlan::default()).await;
    setup_venue_on(db, plan).await
}

pub async fn setup_venue_on(db: &DatabaseConnection, plan: subscription_plan::Model) -> Venue {
    let cafe = subscribed_cafe(db, "Corner Café", &plan).await;
    let branch = create_branch(db, cafe.id, "Downtown").await;
    let hall = create_section(db, branch.id, "Main Hall", SectionType::Standard, 10, 0.0).await;
    let lounge = create_section(db, branch.id, "Lounge", SectionType::Vip, 4, 25.0).await;

    let home = cafes::create_team(db, "Al Ahly", Some("AHL".to_string()))
        .await
        .expect("Failed to create team");
    let away = cafes::create_team(db, "Zamalek", Some("ZAM".to_string()))
        .await
        .expect("Failed to create team");

    Venue {
        cafe,
        branch,
        plan,
        hall,
        lounge,
        home_team: home.id,
        away_team: away.id,
    }
}

pub fn new_match(venue: &Venue, days_ahead: i64) -> NewMatch {
    NewMatch {
        branch_id: venue.branch.id,
        home_team_id: venue.home_team,
        away_team_id: venue.away_team,
        match_date: (now() + Duration::days(days_ahead)).date_naive(),
        kick_off: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        total_seats: None,
        price_per_seat: 50.0,
        currency: None,
        duration_minutes: None,
        booking_opens_at: None,
        booking_closes_at: None,
    }
}

/// A published match at the venue, `days_ahead` days from [`now`].
pub async fn published_match(db: &DatabaseConnection, venue: &Venue, days_ahead: i64) -> matches::Model {
    let draft = fixtures::create_match(db, &rules(), new_match(venue, days_ahead), now())
        .await
        .expect("Failed to create match");
    fixtures::publish_match(db, draft.id)
        .await
        .expect("Failed to publish match")
}

pub async fn book(
    db: &DatabaseConnection,
    user_id: Uuid,
    match_id: Uuid,
    seat_ids: Vec<Uuid>,
) -> BookingOutcome {
    booking::create_booking(
        db,
        &rules(),
        user_id,
        NewBooking {
            match_id,
            seat_ids,
            guests_count: None,
            special_requests: None,
        },
        now(),
    )
    .await
    .expect("Failed to create booking")
}

pub async fn reload_match(db: &DatabaseConnection, match_id: Uuid) -> matches::Model {
    matches::Entity::find_by_id(match_id)
        .one(db)
        .await
        .unwrap()
        .expect("match exists")
}

pub async fn reload_seat(db: &DatabaseConnection, seat_id: Uuid) -> seat::Model {
    seat::Entity::find_by_id(seat_id)
        .one(db)
        .await
        .unwrap()
        .expect("seat exists")
}

pub async fn payment_for(db: &DatabaseConnection, booking_id: Uuid) -> payment::Model {
    booking::get_booking_details(db, booking_id)
        .await
        .unwrap()
        .payment
        .expect("booking has a payment")
}

/// Gateway whose calls can be made to fail.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    pub decline_charges: bool,
    pub refunds_down: bool,
    pub refunds: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(
        &self,
        payment: &payment::Model,
        _method: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        Ok(GatewayResponse {
            success: !self.decline_charges,
            gateway_ref: Some(format!("ch_{}", payment.id.simple())),
            message: Some(
                (if self.decline_charges { "Declined" } else { "Approved" }).to_string(),
            ),
        })
    }

    async fn refund(&self, payment: &payment::Model) -> Result<GatewayResponse, GatewayError> {
        if self.refunds_down {
            return Err(GatewayError::Timeout);
        }
        self.refunds.lock().unwrap().push(payment.id);
        Ok(GatewayResponse {
            success: true,
            gateway_ref: Some(format!("rf_{}", payment.id.simple())),
            message: Some("Refunded".to_string()),
        })
    }
}

/// Records every notification it is asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Uuid, &'static str)>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, user_id: Uuid, event: &DomainEvent) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((user_id, event.name()));
        Ok(())
    }
}

pub fn shared<T: PaymentGateway + 'static>(gateway: T) -> Arc<dyn PaymentGateway> {
    Arc::new(gateway)
}
