//! Booking lifecycle: creation, cancellation, payment capture and expiry.
//!
//! Every state change runs in one database transaction. The payment gateway
//! is only called outside of it: charges before the payment row is updated,
//! refunds after the cancellation has committed.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::config::BookingRules;
use crate::entities::booking::{self, BookingStatus};
use crate::entities::payment::{self, PaymentStatus};
use crate::entities::{booking_seat, branch, matches, seat, seating_section};
use crate::error::{AppError, AppResult, ConflictKind};
use crate::gateways::PaymentGateway;
use crate::services::admission::{self, ResourceKind};
use crate::services::events::DomainEvent;
use crate::services::matches::locked_match;
use crate::services::{loyalty, queries, seats};
use crate::utils::codes::{generate_booking_code, QrPayload};
use crate::utils::money::round2;

const MAX_CODE_ATTEMPTS: usize = 8;
const MAX_SPECIAL_REQUESTS_LEN: usize = 500;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub match_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub guests_count: Option<i32>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub subtotal: f64,
    pub service_fee: f64,
    pub total: f64,
}

/// Prices a booking: each seat costs the match price plus its section
/// surcharge, and the service fee is a rate with a floor.
pub fn calculate_cost(price_per_seat: f64, surcharges: &[f64], rules: &BookingRules) -> CostBreakdown {
    let subtotal = round2(surcharges.iter().map(|extra| price_per_seat + extra).sum());
    let service_fee = round2((subtotal * rules.service_fee_rate).max(rules.min_service_fee));
    CostBreakdown {
        subtotal,
        service_fee,
        total: round2(subtotal + service_fee),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookedSeat {
    pub seat_id: Uuid,
    pub label: String,
    pub section: String,
    pub price: f64,
    pub released: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub seats: Vec<BookedSeat>,
    pub payment: Option<payment::Model>,
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub details: BookingDetails,
    pub cost: CostBreakdown,
    pub events: Vec<DomainEvent>,
}

fn dedupe(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn validate_new_booking(input: &NewBooking, seat_count: usize) -> AppResult<i32> {
    if seat_count == 0 {
        return Err(AppError::Validation("At least one seat is required".to_string()));
    }
    let seats = seat_count as i32;
    let guests = input.guests_count.unwrap_or(seats);
    if guests < 1 || guests > seats {
        return Err(AppError::Validation(format!(
            "Guests must be between 1 and the {} seat(s) booked",
            seats
        )));
    }
    if input
        .special_requests
        .as_ref()
        .is_some_and(|r| r.chars().count() > MAX_SPECIAL_REQUESTS_LEN)
    {
        return Err(AppError::Validation(format!(
            "Special requests are limited to {} characters",
            MAX_SPECIAL_REQUESTS_LEN
        )));
    }
    Ok(guests)
}

async fn unique_booking_code<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_booking_code();
        let taken = booking::Entity::find()
            .filter(booking::Column::Code.eq(code.as_str()))
            .count(conn)
            .await?;
        if taken == 0 {
            return Ok(code);
        }
    }
    Err(AppError::Internal("Could not allocate a unique booking code".to_string()))
}

/// Books seats for a match in one transaction: seats are claimed, the match
/// counter is decremented, loyalty points are awarded and a pending payment
/// is opened. Any failure leaves inventory untouched.
pub async fn create_booking(
    db: &DatabaseConnection,
    rules: &BookingRules,
    user_id: Uuid,
    input: NewBooking,
    now: DateTime<Utc>,
) -> AppResult<BookingOutcome> {
    let seat_ids = dedupe(&input.seat_ids);
    let guests = validate_new_booking(&input, seat_ids.len())?;
    let seat_count = seat_ids.len() as i32;

    let txn = db.begin().await?;

    let game = locked_match(&txn, input.match_id).await?;

    if let Some(reason) = game.booking_window_error(now) {
        return Err(AppError::InvalidState(reason));
    }

    let venue = branch::Entity::find_by_id(game.branch_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    let existing = booking::Entity::find()
        .filter(queries::booking_for_match(game.id))
        .filter(queries::booking_for_user(user_id))
        .filter(queries::booking_not_cancelled())
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(AppError::Conflict(
            ConflictKind::DuplicateBooking,
            "You already have a booking for this match".to_string(),
        ));
    }

    if game.seats_available < seat_count {
        return Err(AppError::Conflict(
            ConflictKind::SeatUnavailable,
            format!("Only {} seat(s) left for this match", game.seats_available.max(0)),
        ));
    }

    admission::ensure_admitted(&txn, venue.cafe_id, ResourceKind::Booking, now).await?;

    let reserved = seats::reserve_seats(&txn, game.branch_id, &seat_ids).await?;
    let surcharges: Vec<f64> = reserved.iter().map(|r| r.section.extra_cost).collect();
    let cost = calculate_cost(game.price_per_seat, &surcharges, rules);

    let decremented = matches::Entity::update_many()
        .col_expr(
            matches::Column::SeatsAvailable,
            Expr::col(matches::Column::SeatsAvailable).sub(seat_count),
        )
        .filter(matches::Column::Id.eq(game.id))
        .filter(matches::Column::SeatsAvailable.gte(seat_count))
        .exec(&txn)
        .await?
        .rows_affected;
    if decremented != 1 {
        return Err(AppError::Conflict(
            ConflictKind::SeatUnavailable,
            "Match sold out while booking".to_string(),
        ));
    }

    let booking_id = Uuid::new_v4();
    let code = unique_booking_code(&txn).await?;
    let qr_payload = QrPayload {
        booking_id,
        code: code.clone(),
        user_id,
        match_id: game.id,
        issued_at: now,
    }
    .encode()?;

    let points = rules.loyalty_points_per_booking.max(0);
    let booking = booking::ActiveModel {
        id: Set(booking_id),
        code: Set(code.clone()),
        user_id: Set(user_id),
        match_id: Set(game.id),
        branch_id: Set(game.branch_id),
        guests_count: Set(guests),
        status: Set(BookingStatus::Confirmed),
        subtotal: Set(cost.subtotal),
        service_fee: Set(cost.service_fee),
        total_amount: Set(cost.total),
        currency: Set(game.currency.clone()),
        special_requests: Set(input
            .special_requests
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())),
        qr_payload: Set(qr_payload),
        loyalty_points_awarded: Set(points),
        checked_in_at: Set(None),
        cancelled_at: Set(None),
        cancellation_reason: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let holds: Vec<booking_seat::ActiveModel> = reserved
        .iter()
        .map(|r| booking_seat::ActiveModel {
            booking_id: Set(booking_id),
            seat_id: Set(r.seat.id),
            price: Set(r.price(game.price_per_seat)),
            released_at: Set(None),
        })
        .collect();
    booking_seat::Entity::insert_many(holds)
        .exec_without_returning(&txn)
        .await?;

    loyalty::award_points(&txn, user_id, booking_id, points, &format!("Booking {}", code)).await?;

    let payment = payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking_id),
        user_id: Set(user_id),
        amount: Set(cost.total),
        currency: Set(game.currency.clone()),
        status: Set(PaymentStatus::Pending),
        method: Set(None),
        gateway_ref: Set(None),
        message: Set(None),
        paid_at: Set(None),
        refunded_at: Set(None),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        code = %booking.code,
        match_id = %game.id,
        user_id = %user_id,
        seats = reserved.len(),
        total = cost.total,
        "Booking confirmed"
    );

    let seats = reserved
        .iter()
        .map(|r| BookedSeat {
            seat_id: r.seat.id,
            label: r.seat.label.clone(),
            section: r.section.name.clone(),
            price: r.price(game.price_per_seat),
            released: false,
        })
        .collect::<Vec<_>>();

    let events = vec![DomainEvent::BookingConfirmed {
        booking_id: booking.id,
        code: booking.code.clone(),
        user_id,
        match_id: game.id,
        branch_id: game.branch_id,
        seats: seats.len(),
        total_amount: cost.total,
    }];

    Ok(BookingOutcome {
        details: BookingDetails {
            booking,
            seats,
            payment: Some(payment),
        },
        cost,
        events,
    })
}

/// Who is asking for a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelActor {
    /// The booking's owner; subject to ownership and the kick-off cutoff.
    Customer(Uuid),
    /// Café staff or owners acting on a booking at their venue.
    Venue,
    /// Background jobs and match cascades.
    System,
}

/// Whether `actor` may cancel a booking in its current state.
pub fn ensure_cancellable(
    booking: &booking::Model,
    kick_off: DateTime<Utc>,
    actor: CancelActor,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if let CancelActor::Customer(user_id) = actor {
        if booking.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only cancel your own bookings".to_string(),
            ));
        }
    }

    if !booking.status.can_transition_to(BookingStatus::Cancelled) {
        return Err(AppError::Conflict(
            ConflictKind::AlreadyTerminal,
            format!("Booking is already {:?}", booking.status).to_lowercase(),
        ));
    }
    // Once seated, only the venue can undo a booking.
    if booking.status == BookingStatus::CheckedIn && matches!(actor, CancelActor::Customer(_)) {
        return Err(AppError::Conflict(
            ConflictKind::AlreadyTerminal,
            "Booking has already been checked in".to_string(),
        ));
    }

    if matches!(actor, CancelActor::Customer(_)) && now >= kick_off {
        return Err(AppError::InvalidState(
            "Bookings cannot be cancelled after kick-off".to_string(),
        ));
    }
    Ok(())
}

/// Result of cancelling a booking inside a transaction.
#[derive(Debug, Clone)]
pub struct CancelledBooking {
    pub booking: booking::Model,
    pub seats_released: Vec<Uuid>,
    pub points_reversed: i32,
    /// A captured payment that must be refunded once the transaction commits.
    pub refundable: Option<payment::Model>,
}

/// Applies a cancellation within `conn`: status, seat holds, the match
/// counter, loyalty points and any pending payment. Callers check
/// [`ensure_cancellable`] first.
pub async fn cancel_in_txn<C: ConnectionTrait>(
    conn: &C,
    booking: booking::Model,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<CancelledBooking> {
    let booking_id = booking.id;
    let match_id = booking.match_id;
    let user_id = booking.user_id;
    let points = booking.loyalty_points_awarded;
    let code = booking.code.clone();

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(BookingStatus::Cancelled);
    active.cancelled_at = Set(Some(now.into()));
    active.cancellation_reason = Set(reason);
    active.updated_at = Set(now.into());
    let booking = active.update(conn).await?;

    let seats_released = seats::release_booking_seats(conn, booking_id, now).await?;
    if !seats_released.is_empty() {
        matches::Entity::update_many()
            .col_expr(
                matches::Column::SeatsAvailable,
                Expr::col(matches::Column::SeatsAvailable).add(seats_released.len() as i32),
            )
            .filter(matches::Column::Id.eq(match_id))
            .exec(conn)
            .await?;
    }

    let points_reversed = loyalty::reverse_points(
        conn,
        user_id,
        booking_id,
        points,
        &format!("Booking {} cancelled", code),
    )
    .await?;

    let mut refundable = None;
    if let Some(payment) = payment::Entity::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .one(conn)
        .await?
    {
        match payment.status {
            PaymentStatus::Pending | PaymentStatus::Failed => {
                let mut active: payment::ActiveModel = payment.into();
                active.status = Set(PaymentStatus::Cancelled);
                active.update(conn).await?;
            }
            PaymentStatus::Paid => refundable = Some(payment),
            PaymentStatus::Refunded | PaymentStatus::Cancelled => {}
        }
    }

    Ok(CancelledBooking {
        booking,
        seats_released,
        points_reversed,
        refundable,
    })
}

/// Refunds a captured payment. Gateway failures are logged and reported as
/// `false`; the cancellation that triggered the refund stands either way.
pub async fn refund_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    payment: payment::Model,
    now: DateTime<Utc>,
) -> bool {
    let payment_id = payment.id;
    let response = match gateway.refund(&payment).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(payment_id = %payment_id, error = %e, "Refund failed");
            return false;
        }
    };

    let mut active: payment::ActiveModel = payment.into();
    active.message = Set(response.message.clone());
    if response.success {
        active.status = Set(PaymentStatus::Refunded);
        active.refunded_at = Set(Some(now.into()));
    }
    if let Err(e) = active.update(db).await {
        tracing::error!(payment_id = %payment_id, error = %e, "Failed to record refund");
    }

    if !response.success {
        tracing::warn!(payment_id = %payment_id, message = ?response.message, "Refund declined");
    }
    response.success
}

#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub booking: booking::Model,
    pub seats_released: usize,
    pub refunded: bool,
    pub events: Vec<DomainEvent>,
}

/// Cancels a booking, restoring its seats and reversing its points.
pub async fn cancel_booking(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    booking_id: Uuid,
    actor: CancelActor,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<CancellationOutcome> {
    let cancellable = BookingStatus::sources_of(BookingStatus::Cancelled);
    cancel_guarded(db, gateway, booking_id, actor, reason, now, &cancellable).await
}

/// Cancels a booking only while it is in one of `statuses`, checked under
/// the row lock.
async fn cancel_guarded(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    booking_id: Uuid,
    actor: CancelActor,
    reason: Option<String>,
    now: DateTime<Utc>,
    statuses: &[BookingStatus],
) -> AppResult<CancellationOutcome> {
    let match_id = booking::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?
        .match_id;

    let txn = db.begin().await?;

    // Match before booking, the same order as match cancellation and finishing.
    let game = locked_match(&txn, match_id).await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    ensure_cancellable(&booking, game.starts_at(), actor, now)?;
    if !statuses.contains(&booking.status) {
        return Err(AppError::Conflict(
            ConflictKind::InvalidStatus,
            format!("Booking is {:?}", booking.status).to_lowercase(),
        ));
    }

    let cancelled = cancel_in_txn(&txn, booking, reason.clone(), now).await?;

    txn.commit().await?;

    let mut events = Vec::new();
    let refunded = match cancelled.refundable {
        Some(payment) => {
            let (payment_id, amount) = (payment.id, payment.amount);
            let ok = refund_payment(db, gateway, payment, now).await;
            if ok {
                events.push(DomainEvent::PaymentRefunded {
                    payment_id,
                    booking_id,
                    user_id: cancelled.booking.user_id,
                    amount,
                });
            }
            ok
        }
        None => false,
    };

    let booking = cancelled.booking;
    tracing::info!(
        booking_id = %booking.id,
        actor = ?actor,
        seats_released = cancelled.seats_released.len(),
        points_reversed = cancelled.points_reversed,
        refunded,
        "Booking cancelled"
    );

    events.insert(
        0,
        DomainEvent::BookingCancelled {
            booking_id: booking.id,
            user_id: booking.user_id,
            match_id: booking.match_id,
            branch_id: booking.branch_id,
            refunded,
            reason,
        },
    );

    Ok(CancellationOutcome {
        seats_released: cancelled.seats_released.len(),
        booking,
        refunded,
        events,
    })
}

#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub payment: payment::Model,
    pub events: Vec<DomainEvent>,
}

/// Charges the pending payment of a booking through the gateway.
pub async fn capture_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    booking_id: Uuid,
    user_id: Uuid,
    method: &str,
    now: DateTime<Utc>,
) -> AppResult<PaymentOutcome> {
    let method = method.trim();
    if method.is_empty() || method.len() > 30 {
        return Err(AppError::Validation("A payment method is required".to_string()));
    }

    let booking = booking::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    if booking.user_id != user_id {
        return Err(AppError::Forbidden("You can only pay for your own bookings".to_string()));
    }
    if booking.status.is_terminal() {
        return Err(AppError::Conflict(
            ConflictKind::AlreadyTerminal,
            format!("Booking is {:?}", booking.status),
        ));
    }

    let payment = payment::Entity::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
    ensure_chargeable(&payment)?;

    let response = gateway.charge(&payment, method).await.map_err(|e| {
        tracing::warn!(payment_id = %payment.id, error = %e, "Charge failed");
        AppError::External(format!("Payment gateway unavailable: {}", e))
    })?;

    let txn = db.begin().await?;
    let current = payment::Entity::find_by_id(payment.id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
    ensure_chargeable(&current)?;

    let mut active: payment::ActiveModel = current.into();
    active.method = Set(Some(method.to_string()));
    active.gateway_ref = Set(response.gateway_ref.clone());
    active.message = Set(response.message.clone());
    if response.success {
        active.status = Set(PaymentStatus::Paid);
        active.paid_at = Set(Some(now.into()));
    } else {
        active.status = Set(PaymentStatus::Failed);
    }
    let payment = active.update(&txn).await?;
    txn.commit().await?;

    let mut events = Vec::new();
    if response.success {
        tracing::info!(payment_id = %payment.id, booking_id = %booking_id, amount = payment.amount, "Payment captured");
        events.push(DomainEvent::PaymentCaptured {
            payment_id: payment.id,
            booking_id,
            user_id,
            amount: payment.amount,
        });
    } else {
        tracing::info!(payment_id = %payment.id, message = ?payment.message, "Payment declined");
    }

    Ok(PaymentOutcome { payment, events })
}

fn ensure_chargeable(payment: &payment::Model) -> AppResult<()> {
    match payment.status {
        PaymentStatus::Pending | PaymentStatus::Failed => Ok(()),
        status => Err(AppError::Conflict(
            ConflictKind::InvalidStatus,
            format!("Payment is already {:?}", status).to_lowercase(),
        )),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpiryOutcome {
    pub cancelled: Vec<Uuid>,
    pub events: Vec<DomainEvent>,
}

/// Cancels bookings whose payment is still pending after `cutoff`. Guests
/// who already arrived keep their booking.
pub async fn expire_stale_payments(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<ExpiryOutcome> {
    let unpaid: Vec<Uuid> = payment::Entity::find()
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .filter(payment::Column::CreatedAt.lt(cutoff.fixed_offset()))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.booking_id)
        .collect();
    if unpaid.is_empty() {
        return Ok(ExpiryOutcome::default());
    }

    let waiting = BookingStatus::awaiting_arrival();
    let stale = booking::Entity::find()
        .filter(booking::Column::Id.is_in(unpaid))
        .filter(queries::booking_in(&waiting))
        .all(db)
        .await?;

    let mut outcome = ExpiryOutcome::default();
    for booking in stale {
        match cancel_guarded(
            db,
            gateway,
            booking.id,
            CancelActor::System,
            Some("Payment not completed in time".to_string()),
            now,
            &waiting,
        )
        .await
        {
            Ok(cancelled) => {
                outcome.cancelled.push(cancelled.booking.id);
                outcome.events.extend(cancelled.events);
            }
            // Checked in or cancelled since the sweep started.
            Err(AppError::Conflict(
                ConflictKind::AlreadyTerminal | ConflictKind::InvalidStatus,
                _,
            )) => {}
            Err(e) => return Err(e),
        }
    }

    if !outcome.cancelled.is_empty() {
        tracing::info!(count = outcome.cancelled.len(), "Expired unpaid bookings");
    }
    Ok(outcome)
}

/// Loads a booking with its seats and payment.
pub async fn get_booking_details<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> AppResult<BookingDetails> {
    let booking = booking::Entity::find_by_id(booking_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    details_for(conn, vec![booking])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

/// A user's bookings, newest first.
pub async fn list_user_bookings<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Vec<BookingDetails>> {
    let bookings = booking::Entity::find()
        .filter(queries::booking_for_user(user_id))
        .order_by_desc(booking::Column::CreatedAt)
        .all(conn)
        .await?;
    details_for(conn, bookings).await
}

async fn details_for<C: ConnectionTrait>(
    conn: &C,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<BookingDetails>> {
    if bookings.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();

    let holds = booking_seat::Entity::find()
        .filter(booking_seat::Column::BookingId.is_in(ids.clone()))
        .all(conn)
        .await?;
    let seat_rows: HashMap<Uuid, seat::Model> = seat::Entity::find()
        .filter(seat::Column::Id.is_in(holds.iter().map(|h| h.seat_id)))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let section_names: HashMap<Uuid, String> = seating_section::Entity::find()
        .filter(seating_section::Column::Id.is_in(seat_rows.values().map(|s| s.section_id)))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    let mut payments: HashMap<Uuid, payment::Model> = payment::Entity::find()
        .filter(payment::Column::BookingId.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.booking_id, p))
        .collect();

    let mut seats_by_booking: HashMap<Uuid, Vec<BookedSeat>> = HashMap::new();
    for hold in holds {
        // Deleted seats keep no row; their hold is history only.
        let Some(seat) = seat_rows.get(&hold.seat_id) else {
            continue;
        };
        seats_by_booking
            .entry(hold.booking_id)
            .or_default()
            .push(BookedSeat {
                seat_id: seat.id,
                label: seat.label.clone(),
                section: section_names.get(&seat.section_id).cloned().unwrap_or_default(),
                price: hold.price,
                released: hold.released_at.is_some(),
            });
    }

    Ok(bookings
        .into_iter()
        .map(|booking| {
            let mut seats = seats_by_booking.remove(&booking.id).unwrap_or_default();
            seats.sort_by(|a, b| a.label.cmp(&b.label));
            BookingDetails {
                payment: payments.remove(&booking.id),
                booking,
                seats,
            }
        })
        .collect())
}
