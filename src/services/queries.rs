//! Named, composable filters shared by the services.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::{booking_seat, matches};
use crate::entities::matches::MatchStatus;

pub fn booking_for_match(match_id: Uuid) -> Condition {
    Condition::all().add(booking::Column::MatchId.eq(match_id))
}

pub fn booking_for_user(user_id: Uuid) -> Condition {
    Condition::all().add(booking::Column::UserId.eq(user_id))
}

pub fn booking_not_cancelled() -> Condition {
    Condition::all().add(booking::Column::Status.ne(BookingStatus::Cancelled))
}

pub fn booking_in(statuses: &[BookingStatus]) -> Condition {
    Condition::all().add(booking::Column::Status.is_in(statuses.iter().copied()))
}

pub fn hold_active() -> Condition {
    Condition::all().add(booking_seat::Column::ReleasedAt.is_null())
}

pub fn match_at_branch(branch_id: Uuid) -> Condition {
    Condition::all().add(matches::Column::BranchId.eq(branch_id))
}

pub fn match_on(date: NaiveDate) -> Condition {
    Condition::all().add(matches::Column::MatchDate.eq(date))
}

pub fn match_not_cancelled() -> Condition {
    Condition::all().add(matches::Column::Status.ne(MatchStatus::Cancelled))
}

/// Published matches that can still take bookings.
pub fn match_open_for_booking() -> Condition {
    Condition::all()
        .add(matches::Column::IsPublished.eq(true))
        .add(matches::Column::Status.is_in([MatchStatus::Upcoming, MatchStatus::Live]))
}
