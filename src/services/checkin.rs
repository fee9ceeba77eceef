//! Door check-in by booking code or QR payload.
//!
//! Every scan attempt is written to the scan log, whatever its outcome.

use std::time::Instant;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::qr_scan_log::{self, ScanResult};
use crate::entities::{branch, matches};
use crate::error::{AppError, AppResult, ConflictKind};
use crate::services::events::DomainEvent;
use crate::utils::codes::QrPayload;

pub const MAX_SCAN_LOG_PAGE: u64 = 200;

#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub result: ScanResult,
    pub already_checked_in: bool,
    pub booking: booking::Model,
    #[serde(skip)]
    pub events: Vec<DomainEvent>,
}

/// What a scan decided, before it is logged and reported.
#[derive(Debug)]
enum Verdict {
    NotFound,
    WrongCafe(booking::Model),
    AlreadyCheckedIn(booking::Model),
    InvalidStatus(booking::Model),
    CheckedIn(booking::Model),
}

impl Verdict {
    fn result(&self) -> ScanResult {
        match self {
            Verdict::NotFound => ScanResult::NotFound,
            Verdict::WrongCafe(_) => ScanResult::WrongCafe,
            Verdict::AlreadyCheckedIn(_) => ScanResult::AlreadyCheckedIn,
            Verdict::InvalidStatus(_) => ScanResult::InvalidStatus,
            Verdict::CheckedIn(_) => ScanResult::Success,
        }
    }

    fn booking(&self) -> Option<&booking::Model> {
        match self {
            Verdict::NotFound => None,
            Verdict::WrongCafe(b)
            | Verdict::AlreadyCheckedIn(b)
            | Verdict::InvalidStatus(b)
            | Verdict::CheckedIn(b) => Some(b),
        }
    }

    fn error_message(&self) -> Option<String> {
        match self {
            Verdict::NotFound => Some("No booking matches this code".to_string()),
            Verdict::WrongCafe(_) => Some("Booking belongs to another café".to_string()),
            Verdict::InvalidStatus(b) => Some(format!("Booking is {:?}", b.status).to_lowercase()),
            Verdict::AlreadyCheckedIn(_) | Verdict::CheckedIn(_) => None,
        }
    }
}

/// Matches either a bare booking code or a full QR payload.
fn lookup_condition(raw: &str) -> Condition {
    let by_text = Condition::any()
        .add(booking::Column::Code.eq(raw.to_uppercase()))
        .add(booking::Column::QrPayload.eq(raw));
    match QrPayload::decode(raw) {
        Some(payload) => by_text.add(
            Condition::all()
                .add(booking::Column::Id.eq(payload.booking_id))
                .add(booking::Column::Code.eq(payload.code)),
        ),
        None => by_text,
    }
}

/// Café that hosts a booking, via its branch or, failing that, its match.
async fn hosting_cafe<C: ConnectionTrait>(conn: &C, booking: &booking::Model) -> AppResult<Option<Uuid>> {
    if let Some(venue) = branch::Entity::find_by_id(booking.branch_id).one(conn).await? {
        return Ok(Some(venue.cafe_id));
    }
    let Some(game) = matches::Entity::find_by_id(booking.match_id).one(conn).await? else {
        return Ok(None);
    };
    Ok(branch::Entity::find_by_id(game.branch_id)
        .one(conn)
        .await?
        .map(|venue| venue.cafe_id))
}

async fn decide<C: ConnectionTrait>(
    conn: &C,
    raw: &str,
    cafe_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Verdict> {
    if raw.is_empty() {
        return Ok(Verdict::NotFound);
    }
    let Some(booking) = booking::Entity::find()
        .filter(lookup_condition(raw))
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(Verdict::NotFound);
    };

    if hosting_cafe(conn, &booking).await? != Some(cafe_id) {
        return Ok(Verdict::WrongCafe(booking));
    }

    if booking.status == BookingStatus::CheckedIn {
        return Ok(Verdict::AlreadyCheckedIn(booking));
    }
    if !booking.status.can_transition_to(BookingStatus::CheckedIn) {
        return Ok(Verdict::InvalidStatus(booking));
    }

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(BookingStatus::CheckedIn);
    active.checked_in_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    Ok(Verdict::CheckedIn(active.update(conn).await?))
}

/// Checks a guest in at `cafe_id`. Scanning an already checked-in booking
/// succeeds again without changing it.
pub async fn scan(
    db: &DatabaseConnection,
    raw_code: &str,
    cafe_id: Uuid,
    scanned_by: Uuid,
    now: DateTime<Utc>,
) -> AppResult<ScanOutcome> {
    let started = Instant::now();
    let code = raw_code.trim();

    let txn = db.begin().await?;
    let verdict = decide(&txn, code, cafe_id, now).await?;

    qr_scan_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(verdict.booking().map(|b| b.id)),
        cafe_id: Set(cafe_id),
        scanned_by: Set(scanned_by),
        scanned_code: Set(code.to_string()),
        result: Set(verdict.result()),
        processing_ms: Set(i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)),
        error_message: Set(verdict.error_message()),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        cafe_id = %cafe_id,
        scanned_by = %scanned_by,
        result = ?verdict.result(),
        booking_id = ?verdict.booking().map(|b| b.id),
        "QR scan"
    );

    let message = verdict.error_message();
    match verdict {
        Verdict::NotFound => Err(AppError::NotFound(message.unwrap_or_default())),
        Verdict::WrongCafe(_) => Err(AppError::Forbidden(message.unwrap_or_default())),
        Verdict::InvalidStatus(_) => Err(AppError::Conflict(
            ConflictKind::InvalidStatus,
            message.unwrap_or_default(),
        )),
        Verdict::AlreadyCheckedIn(booking) => Ok(ScanOutcome {
            result: ScanResult::AlreadyCheckedIn,
            already_checked_in: true,
            booking,
            events: Vec::new(),
        }),
        Verdict::CheckedIn(booking) => {
            let events = vec![DomainEvent::BookingCheckedIn {
                booking_id: booking.id,
                user_id: booking.user_id,
                match_id: booking.match_id,
                branch_id: booking.branch_id,
                checked_in_at: now,
            }];
            Ok(ScanOutcome {
                result: ScanResult::Success,
                already_checked_in: false,
                booking,
                events,
            })
        }
    }
}

/// Most recent scan attempts at a café.
pub async fn list_scan_logs<C: ConnectionTrait>(
    conn: &C,
    cafe_id: Uuid,
    limit: u64,
) -> AppResult<Vec<qr_scan_log::Model>> {
    Ok(qr_scan_log::Entity::find()
        .filter(qr_scan_log::Column::CafeId.eq(cafe_id))
        .order_by_desc(qr_scan_log::Column::CreatedAt)
        .limit(limit.clamp(1, MAX_SCAN_LOG_PAGE))
        .all(conn)
        .await?)
}
