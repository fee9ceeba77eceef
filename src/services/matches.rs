//! Match scheduling, status transitions and the seat counter.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::config::BookingRules;
use crate::entities::booking::{self, BookingStatus};
use crate::entities::matches::{self, MatchStatus};
use crate::entities::{booking_seat, branch, seat, seating_section, team};
use crate::error::{AppError, AppResult};
use crate::gateways::PaymentGateway;
use crate::services::admission::{self, ResourceKind};
use crate::services::booking::{cancel_in_txn, refund_payment};
use crate::services::events::DomainEvent;
use crate::services::{queries, seats};
use crate::utils::money::round2;

pub const DEFAULT_DURATION_MINUTES: i32 = 120;

#[derive(Debug, Clone)]
pub struct NewMatch {
    pub branch_id: Uuid,
    pub home_team_id: i32,
    pub away_team_id: i32,
    pub match_date: NaiveDate,
    pub kick_off: NaiveTime,
    pub total_seats: Option<i32>,
    pub price_per_seat: f64,
    pub currency: Option<String>,
    pub duration_minutes: Option<i32>,
    pub booking_opens_at: Option<DateTime<Utc>>,
    pub booking_closes_at: Option<DateTime<Utc>>,
}

fn validate_new_match(input: &NewMatch) -> AppResult<()> {
    if input.home_team_id == input.away_team_id {
        return Err(AppError::Validation("A team cannot play itself".to_string()));
    }
    if input.price_per_seat < 0.0 {
        return Err(AppError::Validation("Price per seat cannot be negative".to_string()));
    }
    if input.duration_minutes.is_some_and(|d| d <= 0) {
        return Err(AppError::Validation("Duration must be positive".to_string()));
    }
    if let (Some(opens), Some(closes)) = (input.booking_opens_at, input.booking_closes_at) {
        if opens >= closes {
            return Err(AppError::Validation(
                "Booking must open before it closes".to_string(),
            ));
        }
    }
    Ok(())
}

/// Seats configured across every section of a branch.
async fn branch_seat_count<C: ConnectionTrait>(conn: &C, branch_id: Uuid) -> AppResult<u64> {
    let section_ids: Vec<Uuid> = seating_section::Entity::find()
        .filter(seating_section::Column::BranchId.eq(branch_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if section_ids.is_empty() {
        return Ok(0);
    }
    Ok(seat::Entity::find()
        .filter(seat::Column::SectionId.is_in(section_ids))
        .count(conn)
        .await?)
}

/// Schedules a draft match. The seat counter starts at the full capacity.
pub async fn create_match(
    db: &DatabaseConnection,
    rules: &BookingRules,
    input: NewMatch,
    now: DateTime<Utc>,
) -> AppResult<matches::Model> {
    validate_new_match(&input)?;

    let txn = db.begin().await?;

    let venue = branch::Entity::find_by_id(input.branch_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    let teams = team::Entity::find()
        .filter(team::Column::Id.is_in([input.home_team_id, input.away_team_id]))
        .count(&txn)
        .await?;
    if teams != 2 {
        return Err(AppError::Validation("Unknown team".to_string()));
    }

    admission::ensure_admitted(&txn, venue.cafe_id, ResourceKind::Match, now).await?;

    let total_seats = match input.total_seats {
        Some(total) => total,
        None => i32::try_from(branch_seat_count(&txn, venue.id).await?).unwrap_or(i32::MAX),
    };
    if total_seats <= 0 {
        return Err(AppError::Validation(
            "A match needs at least one seat; add seating sections first".to_string(),
        ));
    }

    let game = matches::ActiveModel {
        id: Set(Uuid::new_v4()),
        branch_id: Set(venue.id),
        home_team_id: Set(input.home_team_id),
        away_team_id: Set(input.away_team_id),
        match_date: Set(input.match_date),
        kick_off: Set(input.kick_off),
        status: Set(MatchStatus::Draft),
        total_seats: Set(total_seats),
        seats_available: Set(total_seats),
        price_per_seat: Set(round2(input.price_per_seat)),
        currency: Set(input
            .currency
            .unwrap_or_else(|| rules.default_currency.clone())),
        duration_minutes: Set(input.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)),
        is_published: Set(false),
        booking_opens_at: Set(input.booking_opens_at.map(Into::into)),
        booking_closes_at: Set(input.booking_closes_at.map(Into::into)),
        last_reminder_at: Set(None),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(match_id = %game.id, branch_id = %venue.id, total_seats, "Match created");
    Ok(game)
}

/// Locks a match row for the rest of the transaction. The no-op update
/// takes the write lock on backends that ignore `FOR UPDATE`. Paths that
/// also lock bookings take this lock first.
pub(crate) async fn locked_match<C: ConnectionTrait>(
    conn: &C,
    match_id: Uuid,
) -> AppResult<matches::Model> {
    matches::Entity::update_many()
        .col_expr(
            matches::Column::SeatsAvailable,
            Expr::col(matches::Column::SeatsAvailable).add(0),
        )
        .filter(matches::Column::Id.eq(match_id))
        .exec(conn)
        .await?;

    matches::Entity::find_by_id(match_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Match not found".to_string()))
}

fn invalid_transition(from: MatchStatus, to: MatchStatus) -> AppError {
    AppError::InvalidState(format!("Cannot move a match from {:?} to {:?}", from, to))
}

/// Publishes a draft match, opening it for booking.
pub async fn publish_match(db: &DatabaseConnection, match_id: Uuid) -> AppResult<matches::Model> {
    let txn = db.begin().await?;
    let game = locked_match(&txn, match_id).await?;

    if game.is_published && game.status.is_bookable() {
        return Ok(game);
    }
    if game.status != MatchStatus::Draft {
        return Err(invalid_transition(game.status, MatchStatus::Upcoming));
    }

    let mut active: matches::ActiveModel = game.into();
    active.status = Set(MatchStatus::Upcoming);
    active.is_published = Set(true);
    let game = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(match_id = %game.id, "Match published");
    Ok(game)
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchTransition {
    #[serde(rename = "match")]
    pub game: matches::Model,
    pub bookings_completed: u64,
    pub seats_released: usize,
}

/// Moves a match forward along draft → upcoming → live → finished.
/// Finishing completes checked-in bookings and frees every seat the match
/// still holds. Cancellation goes through [`cancel_match`].
pub async fn transition_match(
    db: &DatabaseConnection,
    match_id: Uuid,
    next: MatchStatus,
    now: DateTime<Utc>,
) -> AppResult<MatchTransition> {
    if next == MatchStatus::Cancelled {
        return Err(AppError::BadRequest(
            "Use match cancellation to cancel a match".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let game = locked_match(&txn, match_id).await?;

    if !game.status.can_transition_to(next) {
        return Err(invalid_transition(game.status, next));
    }

    let mut bookings_completed = 0;
    let mut seats_released = 0;
    if next == MatchStatus::Finished {
        bookings_completed = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(BookingStatus::Completed))
            .col_expr(booking::Column::UpdatedAt, Expr::value(now.fixed_offset()))
            .filter(queries::booking_for_match(game.id))
            .filter(queries::booking_in(&BookingStatus::sources_of(
                BookingStatus::Completed,
            )))
            .exec(&txn)
            .await?
            .rows_affected;

        let holders = booking::Entity::find()
            .filter(queries::booking_for_match(game.id))
            .filter(queries::booking_not_cancelled())
            .all(&txn)
            .await?;
        for holder in holders {
            seats_released += seats::release_booking_seats(&txn, holder.id, now).await?.len();
        }
    }

    let mut active: matches::ActiveModel = game.into();
    active.status = Set(next);
    if next == MatchStatus::Upcoming {
        active.is_published = Set(true);
    }
    let game = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        match_id = %game.id,
        status = ?game.status,
        bookings_completed,
        seats_released,
        "Match status changed"
    );

    Ok(MatchTransition {
        game,
        bookings_completed,
        seats_released,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchCancellation {
    #[serde(rename = "match")]
    pub game: matches::Model,
    pub bookings_cancelled: usize,
    /// Confirmed or checked-in bookings, owed a refund whether or not they
    /// were paid online.
    pub bookings_refunded: usize,
    /// Captured payments the gateway refunded.
    pub refunds_issued: usize,
    /// Captured payments the gateway would not refund; left `paid`.
    pub refunds_failed: usize,
    pub notified_users: usize,
    /// One `MatchCancelled` per affected user.
    #[serde(skip)]
    pub events: Vec<DomainEvent>,
}

/// Cancels a match and every live booking on it. Each affected user is
/// notified once, however many bookings they held.
pub async fn cancel_match(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    match_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<MatchCancellation> {
    let txn = db.begin().await?;
    let game = locked_match(&txn, match_id).await?;

    if !game.status.can_transition_to(MatchStatus::Cancelled) {
        return Err(invalid_transition(game.status, MatchStatus::Cancelled));
    }

    let bookings = booking::Entity::find()
        .filter(queries::booking_for_match(game.id))
        .filter(queries::booking_in(&BookingStatus::sources_of(
            BookingStatus::Cancelled,
        )))
        .lock_exclusive()
        .all(&txn)
        .await?;

    let bookings_refunded = bookings
        .iter()
        .filter(|b| matches!(b.status, BookingStatus::Confirmed | BookingStatus::CheckedIn))
        .count();

    let reason = Some("Match cancelled".to_string());
    let mut cancelled = Vec::with_capacity(bookings.len());
    for booking in bookings {
        cancelled.push(cancel_in_txn(&txn, booking, reason.clone(), now).await?);
    }

    let mut active: matches::ActiveModel = game.into();
    active.status = Set(MatchStatus::Cancelled);
    active.is_published = Set(false);
    let game = active.update(&txn).await?;

    txn.commit().await?;

    // Per user: bookings cancelled, amount refunded, refunds that failed.
    let mut per_user: Vec<(Uuid, usize, f64, usize)> = Vec::new();
    let mut refunds_issued = 0;
    let mut refunds_failed = 0;
    for outcome in cancelled.iter() {
        let user_id = outcome.booking.user_id;
        let index = match per_user.iter().position(|(u, ..)| *u == user_id) {
            Some(index) => index,
            None => {
                per_user.push((user_id, 0, 0.0, 0));
                per_user.len() - 1
            }
        };
        per_user[index].1 += 1;

        if let Some(payment) = outcome.refundable.clone() {
            let amount = payment.amount;
            if refund_payment(db, gateway, payment, now).await {
                refunds_issued += 1;
                per_user[index].2 += amount;
            } else {
                refunds_failed += 1;
                per_user[index].3 += 1;
            }
        }
    }

    let events: Vec<DomainEvent> = per_user
        .iter()
        .map(|&(user_id, bookings_cancelled, refunded, failed)| DomainEvent::MatchCancelled {
            match_id: game.id,
            branch_id: game.branch_id,
            user_id,
            bookings_cancelled,
            refunded_amount: round2(refunded),
            refunds_failed: failed,
        })
        .collect();

    tracing::info!(
        match_id = %game.id,
        bookings_cancelled = cancelled.len(),
        refunds_issued,
        refunds_failed,
        "Match cancelled"
    );

    Ok(MatchCancellation {
        game,
        bookings_cancelled: cancelled.len(),
        bookings_refunded,
        refunds_issued,
        refunds_failed,
        notified_users: events.len(),
        events,
    })
}

/// Seats currently held by live bookings of a match.
pub async fn held_seat_count<C: ConnectionTrait>(conn: &C, match_id: Uuid) -> AppResult<u64> {
    let booking_ids: Vec<Uuid> = booking::Entity::find()
        .filter(queries::booking_for_match(match_id))
        .filter(queries::booking_not_cancelled())
        .all(conn)
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect();
    if booking_ids.is_empty() {
        return Ok(0);
    }
    Ok(booking_seat::Entity::find()
        .filter(booking_seat::Column::BookingId.is_in(booking_ids))
        .filter(queries::hold_active())
        .count(conn)
        .await?)
}

/// Sets the seat counter by hand. It may never promise seats that are
/// already held.
pub async fn override_seats_available(
    db: &DatabaseConnection,
    match_id: Uuid,
    seats_available: i32,
) -> AppResult<matches::Model> {
    let txn = db.begin().await?;
    let game = locked_match(&txn, match_id).await?;

    let held = i32::try_from(held_seat_count(&txn, game.id).await?).unwrap_or(i32::MAX);
    let ceiling = (game.total_seats - held).max(0);
    if !(0..=ceiling).contains(&seats_available) {
        return Err(AppError::Validation(format!(
            "Seats available must be between 0 and {}",
            ceiling
        )));
    }

    let previous = game.seats_available;
    let mut active: matches::ActiveModel = game.into();
    active.seats_available = Set(seats_available);
    let game = active.update(&txn).await?;
    txn.commit().await?;

    tracing::warn!(
        match_id = %game.id,
        previous,
        seats_available,
        "Seat counter overridden"
    );
    Ok(game)
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub branch_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
}

/// Published matches open for booking, soonest first.
pub async fn list_open_matches<C: ConnectionTrait>(
    conn: &C,
    filter: MatchFilter,
) -> AppResult<Vec<matches::Model>> {
    let mut query = matches::Entity::find().filter(queries::match_open_for_booking());
    if let Some(branch_id) = filter.branch_id {
        query = query.filter(queries::match_at_branch(branch_id));
    }
    if let Some(from) = filter.from {
        query = query.filter(matches::Column::MatchDate.gte(from));
    }
    Ok(query
        .order_by_asc(matches::Column::MatchDate)
        .order_by_asc(matches::Column::KickOff)
        .all(conn)
        .await?)
}

/// Loads a match that the public may see.
pub async fn get_published_match<C: ConnectionTrait>(
    conn: &C,
    match_id: Uuid,
) -> AppResult<matches::Model> {
    matches::Entity::find_by_id(match_id)
        .one(conn)
        .await?
        .filter(|m| m.is_published)
        .ok_or_else(|| AppError::NotFound("Match not found".to_string()))
}
