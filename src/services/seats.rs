//! Seat inventory: sections, seat rows and the holds bookings place on them.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::seating_section::{self, SectionType};
use crate::entities::{booking, booking_seat, branch, seat};
use crate::error::{AppError, AppResult, ConflictKind};
use crate::services::queries;
use crate::utils::money::round2;

/// Upper bound on seats generated for one section.
pub const MAX_SECTION_SEATS: i32 = 500;

/// Label prefix for seats in a section of the given type. Custom sections
/// use the first alphanumeric character of their name.
pub fn section_prefix(section_type: SectionType, name: &str) -> String {
    match section_type {
        SectionType::Standard => "S".to_string(),
        SectionType::Vip => "V".to_string(),
        SectionType::Premium => "P".to_string(),
        SectionType::MainScreen => "M".to_string(),
        SectionType::Outdoor => "O".to_string(),
        SectionType::Custom => name
            .chars()
            .find(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase().to_string())
            .unwrap_or_else(|| "C".to_string()),
    }
}

pub fn seat_label(prefix: &str, sequence: i32) -> String {
    format!("{}{}", prefix, sequence)
}

fn new_seat(section_id: Uuid, prefix: &str, sequence: i32) -> seat::ActiveModel {
    seat::ActiveModel {
        id: Set(Uuid::new_v4()),
        section_id: Set(section_id),
        label: Set(seat_label(prefix, sequence)),
        sequence: Set(sequence),
        is_available: Set(true),
        table_number: Set(None),
    }
}

async fn insert_seats<C: ConnectionTrait>(
    conn: &C,
    section_id: Uuid,
    prefix: &str,
    sequences: std::ops::RangeInclusive<i32>,
) -> AppResult<usize> {
    let rows: Vec<seat::ActiveModel> = sequences
        .map(|sequence| new_seat(section_id, prefix, sequence))
        .collect();
    let inserted = rows.len();
    if inserted > 0 {
        seat::Entity::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }
    Ok(inserted)
}

fn validate_section_size(total_seats: i32) -> AppResult<()> {
    if !(0..=MAX_SECTION_SEATS).contains(&total_seats) {
        return Err(AppError::Validation(format!(
            "A section holds between 0 and {} seats",
            MAX_SECTION_SEATS
        )));
    }
    Ok(())
}

/// A seat claimed for a booking, together with its section.
#[derive(Debug, Clone)]
pub struct ReservedSeat {
    pub seat: seat::Model,
    pub section: seating_section::Model,
}

impl ReservedSeat {
    pub fn price(&self, price_per_seat: f64) -> f64 {
        round2(price_per_seat + self.section.extra_cost)
    }
}

/// Flips the requested seats to unavailable. Must run inside the booking
/// transaction: a partial claim is only undone by rolling it back.
pub async fn reserve_seats<C: ConnectionTrait>(
    conn: &C,
    branch_id: Uuid,
    seat_ids: &[Uuid],
) -> AppResult<Vec<ReservedSeat>> {
    if seat_ids.is_empty() {
        return Err(AppError::Validation("At least one seat is required".to_string()));
    }

    let seats = seat::Entity::find()
        .filter(seat::Column::Id.is_in(seat_ids.iter().copied()))
        .all(conn)
        .await?;
    if seats.len() != seat_ids.len() {
        return Err(AppError::NotFound("One or more seats do not exist".to_string()));
    }

    let section_ids: HashSet<Uuid> = seats.iter().map(|s| s.section_id).collect();
    let sections: BTreeMap<Uuid, seating_section::Model> = seating_section::Entity::find()
        .filter(seating_section::Column::Id.is_in(section_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    if sections.values().any(|s| s.branch_id != branch_id) {
        return Err(AppError::Validation(
            "Seats must belong to the branch showing the match".to_string(),
        ));
    }

    let taken: Vec<&str> = seats
        .iter()
        .filter(|s| !s.is_available)
        .map(|s| s.label.as_str())
        .collect();
    if !taken.is_empty() {
        return Err(AppError::Conflict(
            ConflictKind::SeatUnavailable,
            format!("Seats no longer available: {}", taken.join(", ")),
        ));
    }

    let claimed = seat::Entity::update_many()
        .col_expr(seat::Column::IsAvailable, Expr::value(false))
        .filter(seat::Column::Id.is_in(seat_ids.iter().copied()))
        .filter(seat::Column::IsAvailable.eq(true))
        .exec(conn)
        .await?
        .rows_affected;
    if claimed != seat_ids.len() as u64 {
        return Err(AppError::Conflict(
            ConflictKind::SeatUnavailable,
            "Seats were taken by another booking".to_string(),
        ));
    }

    let mut reserved = Vec::with_capacity(seats.len());
    for mut seat in seats {
        let Some(section) = sections.get(&seat.section_id).cloned() else {
            return Err(AppError::Internal(format!("Seat {} has no section", seat.id)));
        };
        seat.is_available = false;
        reserved.push(ReservedSeat { seat, section });
    }
    // Keep the caller's ordering.
    reserved.sort_by_key(|r| seat_ids.iter().position(|id| *id == r.seat.id));
    Ok(reserved)
}

/// Releases every seat still held by `booking_id`, returning the seat ids.
pub async fn release_booking_seats<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Vec<Uuid>> {
    let seat_ids: Vec<Uuid> = booking_seat::Entity::find()
        .filter(booking_seat::Column::BookingId.eq(booking_id))
        .filter(queries::hold_active())
        .all(conn)
        .await?
        .into_iter()
        .map(|hold| hold.seat_id)
        .collect();
    if seat_ids.is_empty() {
        return Ok(seat_ids);
    }

    booking_seat::Entity::update_many()
        .col_expr(booking_seat::Column::ReleasedAt, Expr::value(now.fixed_offset()))
        .filter(booking_seat::Column::BookingId.eq(booking_id))
        .filter(queries::hold_active())
        .exec(conn)
        .await?;

    seat::Entity::update_many()
        .col_expr(seat::Column::IsAvailable, Expr::value(true))
        .filter(seat::Column::Id.is_in(seat_ids.iter().copied()))
        .exec(conn)
        .await?;

    Ok(seat_ids)
}

/// Seats among `seat_ids` that a non-cancelled booking currently holds.
pub async fn held_seat_ids<C: ConnectionTrait>(conn: &C, seat_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    if seat_ids.is_empty() {
        return Ok(Vec::new());
    }
    let holds = booking_seat::Entity::find()
        .filter(booking_seat::Column::SeatId.is_in(seat_ids.iter().copied()))
        .filter(queries::hold_active())
        .all(conn)
        .await?;
    if holds.is_empty() {
        return Ok(Vec::new());
    }

    let live: HashSet<Uuid> = booking::Entity::find()
        .filter(booking::Column::Id.is_in(holds.iter().map(|h| h.booking_id)))
        .filter(queries::booking_not_cancelled())
        .all(conn)
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect();

    Ok(holds
        .into_iter()
        .filter(|h| live.contains(&h.booking_id))
        .map(|h| h.seat_id)
        .collect())
}

async fn ensure_not_held<C: ConnectionTrait>(conn: &C, seat_ids: &[Uuid]) -> AppResult<()> {
    let held = held_seat_ids(conn, seat_ids).await?;
    if !held.is_empty() {
        return Err(AppError::Conflict(
            ConflictKind::SeatInUse,
            format!("{} seat(s) are held by active bookings", held.len()),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewSection {
    pub name: String,
    pub section_type: SectionType,
    pub total_seats: i32,
    pub extra_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSeats {
    #[serde(flatten)]
    pub section: seating_section::Model,
    pub seats: Vec<seat::Model>,
}

/// Creates a section and generates its seats labelled `<prefix><n>`.
pub async fn create_section(
    db: &DatabaseConnection,
    branch_id: Uuid,
    input: NewSection,
) -> AppResult<SectionSeats> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Section name is required".to_string()));
    }
    validate_section_size(input.total_seats)?;
    if input.extra_cost < 0.0 {
        return Err(AppError::Validation("Extra cost cannot be negative".to_string()));
    }

    let txn = db.begin().await?;

    branch::Entity::find_by_id(branch_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    let prefix = section_prefix(input.section_type, &name);
    let section = seating_section::ActiveModel {
        id: Set(Uuid::new_v4()),
        branch_id: Set(branch_id),
        name: Set(name),
        section_type: Set(input.section_type),
        total_seats: Set(input.total_seats),
        extra_cost: Set(round2(input.extra_cost)),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    insert_seats(&txn, section.id, &prefix, 1..=input.total_seats).await?;
    let seats = section_seats(&txn, section.id).await?;

    txn.commit().await?;

    tracing::info!(
        section_id = %section.id,
        branch_id = %branch_id,
        seats = seats.len(),
        "Section created"
    );

    Ok(SectionSeats { section, seats })
}

async fn section_seats<C: ConnectionTrait>(conn: &C, section_id: Uuid) -> AppResult<Vec<seat::Model>> {
    Ok(seat::Entity::find()
        .filter(seat::Column::SectionId.eq(section_id))
        .order_by_asc(seat::Column::Sequence)
        .all(conn)
        .await?)
}

async fn locked_section<C: ConnectionTrait>(
    conn: &C,
    section_id: Uuid,
) -> AppResult<seating_section::Model> {
    seating_section::Entity::find_by_id(section_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Section not found".to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct SectionChanges {
    pub name: Option<String>,
    pub section_type: Option<SectionType>,
    pub extra_cost: Option<f64>,
}

/// Renames or retypes a section. Seat labels follow a prefix change.
pub async fn update_section(
    db: &DatabaseConnection,
    section_id: Uuid,
    changes: SectionChanges,
) -> AppResult<SectionSeats> {
    let txn = db.begin().await?;
    let section = locked_section(&txn, section_id).await?;
    let old_prefix = section_prefix(section.section_type, &section.name);

    let mut active: seating_section::ActiveModel = section.clone().into();
    if let Some(name) = changes.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Section name is required".to_string()));
        }
        active.name = Set(name);
    }
    if let Some(section_type) = changes.section_type {
        active.section_type = Set(section_type);
    }
    if let Some(extra_cost) = changes.extra_cost {
        if extra_cost < 0.0 {
            return Err(AppError::Validation("Extra cost cannot be negative".to_string()));
        }
        active.extra_cost = Set(round2(extra_cost));
    }
    let section = active.update(&txn).await?;

    let new_prefix = section_prefix(section.section_type, &section.name);
    if new_prefix != old_prefix {
        relabel(&txn, section.id, &new_prefix).await?;
    }
    let seats = section_seats(&txn, section.id).await?;

    txn.commit().await?;
    Ok(SectionSeats { section, seats })
}

async fn relabel<C: ConnectionTrait>(conn: &C, section_id: Uuid, prefix: &str) -> AppResult<()> {
    for seat in section_seats(conn, section_id).await? {
        let label = seat_label(prefix, seat.sequence);
        if seat.label == label {
            continue;
        }
        let mut active: seat::ActiveModel = seat.into();
        active.label = Set(label);
        active.update(conn).await?;
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ResizeOutcome {
    #[serde(flatten)]
    pub section: SectionSeats,
    pub added: usize,
    pub removed: usize,
}

/// Grows a section by appending seats after the highest sequence, or shrinks
/// it by dropping the highest-numbered seats. Shrinking never drops a seat
/// that an active booking holds.
pub async fn resize_section(
    db: &DatabaseConnection,
    section_id: Uuid,
    new_total: i32,
) -> AppResult<ResizeOutcome> {
    validate_section_size(new_total)?;

    let txn = db.begin().await?;
    let section = locked_section(&txn, section_id).await?;
    let seats = section_seats(&txn, section.id).await?;
    let current = seats.len() as i32;

    let mut added = 0;
    let mut removed = 0;
    if new_total > current {
        let prefix = section_prefix(section.section_type, &section.name);
        let last = seats.last().map(|s| s.sequence).unwrap_or(0);
        added = insert_seats(&txn, section.id, &prefix, last + 1..=last + (new_total - current)).await?;
    } else if new_total < current {
        let doomed: Vec<Uuid> = seats
            .iter()
            .rev()
            .take((current - new_total) as usize)
            .map(|s| s.id)
            .collect();
        ensure_not_held(&txn, &doomed).await?;
        removed = seat::Entity::delete_many()
            .filter(seat::Column::Id.is_in(doomed))
            .exec(&txn)
            .await?
            .rows_affected as usize;
    }

    let mut active: seating_section::ActiveModel = section.into();
    active.total_seats = Set(new_total);
    let section = active.update(&txn).await?;
    let seats = section_seats(&txn, section.id).await?;

    txn.commit().await?;

    tracing::info!(section_id = %section.id, added, removed, total = new_total, "Section resized");

    Ok(ResizeOutcome {
        section: SectionSeats { section, seats },
        added,
        removed,
    })
}

/// Deletes one seat unless an active booking holds it.
pub async fn delete_seat(db: &DatabaseConnection, seat_id: Uuid) -> AppResult<()> {
    let txn = db.begin().await?;
    let seat = seat::Entity::find_by_id(seat_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;
    let section = locked_section(&txn, seat.section_id).await?;

    ensure_not_held(&txn, &[seat.id]).await?;

    seat::Entity::delete_by_id(seat.id).exec(&txn).await?;

    let total = (section.total_seats - 1).max(0);
    let mut active: seating_section::ActiveModel = section.into();
    active.total_seats = Set(total);
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Takes a seat out of (or back into) circulation.
pub async fn set_seat_blocked(
    db: &DatabaseConnection,
    seat_id: Uuid,
    blocked: bool,
) -> AppResult<seat::Model> {
    let txn = db.begin().await?;
    let seat = seat::Entity::find_by_id(seat_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;

    ensure_not_held(&txn, &[seat.id]).await?;

    let mut active: seat::ActiveModel = seat.into();
    active.is_available = Set(!blocked);
    let seat = active.update(&txn).await?;

    txn.commit().await?;
    Ok(seat)
}

/// Every section of a branch with its seats, in sequence order.
pub async fn list_branch_seats<C: ConnectionTrait>(
    conn: &C,
    branch_id: Uuid,
) -> AppResult<Vec<SectionSeats>> {
    let sections = seating_section::Entity::find()
        .filter(seating_section::Column::BranchId.eq(branch_id))
        .order_by_asc(seating_section::Column::CreatedAt)
        .all(conn)
        .await?;

    let mut out = Vec::with_capacity(sections.len());
    for section in sections {
        let seats = section_seats(conn, section.id).await?;
        out.push(SectionSeats { section, seats });
    }
    Ok(out)
}
