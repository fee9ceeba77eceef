//! Branch occupancy: who is in, who is expected, and when the room peaks.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::{booking_seat, branch, matches, seat, seating_section};
use crate::error::{AppError, AppResult};
use crate::services::matches::DEFAULT_DURATION_MINUTES;
use crate::services::queries;
use crate::utils::money::round1;

pub const PEAK_HOURS_SHOWN: usize = 3;
pub const HISTORY_DAYS: i64 = 7;

pub fn occupancy_percentage(guests: f64, capacity: i32) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    round1(guests / f64::from(capacity) * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuestCounts {
    pub capacity: i32,
    pub current_guests: i32,
    pub reserved: i32,
    pub available: i32,
    pub occupied_percentage: f64,
}

/// Tallies guests by booking status: checked-in guests are present,
/// confirmed ones are expected.
pub fn summarize(capacity: i32, bookings: &[(BookingStatus, i32)]) -> GuestCounts {
    let tally = |status: BookingStatus| -> i32 {
        bookings
            .iter()
            .filter(|(s, _)| *s == status)
            .map(|(_, guests)| *guests)
            .sum()
    };
    let current_guests = tally(BookingStatus::CheckedIn);
    let reserved = tally(BookingStatus::Confirmed);
    GuestCounts {
        capacity,
        current_guests,
        reserved,
        available: (capacity - current_guests - reserved).max(0),
        occupied_percentage: occupancy_percentage(f64::from(current_guests), capacity),
    }
}

/// A party that checked in and stays for a match's duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuestPresence {
    pub checked_in_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub guests: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub guests: f64,
    pub occupancy_percentage: f64,
}

fn start_of_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Guests present per hour of day. A party counts toward every hour its
/// stay touches.
pub fn hourly_load(presences: &[GuestPresence]) -> [f64; 24] {
    let mut load = [0.0; 24];
    for presence in presences {
        let minutes = if presence.duration_minutes > 0 {
            presence.duration_minutes
        } else {
            DEFAULT_DURATION_MINUTES
        };
        let end = presence.checked_in_at + Duration::minutes(i64::from(minutes));
        let mut bucket = start_of_hour(presence.checked_in_at);
        while bucket < end {
            load[bucket.hour() as usize] += f64::from(presence.guests);
            bucket += Duration::hours(1);
        }
    }
    load
}

/// Busiest hours first; ties go to the earlier hour.
pub fn top_hours(load: &[f64; 24], capacity: i32, count: usize) -> Vec<HourBucket> {
    let mut buckets: Vec<HourBucket> = load
        .iter()
        .enumerate()
        .filter(|(_, guests)| **guests > 0.0)
        .map(|(hour, guests)| HourBucket {
            hour: hour as u32,
            guests: *guests,
            occupancy_percentage: occupancy_percentage(*guests, capacity),
        })
        .collect();
    buckets.sort_by(|a, b| {
        b.guests
            .total_cmp(&a.guests)
            .then_with(|| a.hour.cmp(&b.hour))
    });
    buckets.truncate(count);
    buckets
}

pub fn peak_hours(presences: &[GuestPresence], capacity: i32) -> Vec<HourBucket> {
    top_hours(&hourly_load(presences), capacity, PEAK_HOURS_SHOWN)
}

/// Average hourly load over `days`, then its peaks.
pub fn historical_peaks(presences: &[GuestPresence], capacity: i32, days: i64) -> Vec<HourBucket> {
    let days = days.max(1) as f64;
    let mut load = hourly_load(presences);
    for hour in load.iter_mut() {
        *hour = round1(*hour / days);
    }
    top_hours(&load, capacity, PEAK_HOURS_SHOWN)
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionOccupancy {
    pub section_id: Uuid,
    pub name: String,
    pub total_seats: i32,
    pub occupied: i32,
    pub reserved: i32,
    pub occupancy_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupancyReport {
    pub branch_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub matches_today: usize,
    #[serde(flatten)]
    pub counts: GuestCounts,
    pub peak_hours: Vec<HourBucket>,
    pub historical_peaks: Vec<HourBucket>,
    pub sections: Vec<SectionOccupancy>,
}

async fn presences_for<C: ConnectionTrait>(
    conn: &C,
    bookings: &[booking::Model],
) -> AppResult<Vec<GuestPresence>> {
    let match_ids: HashSet<Uuid> = bookings.iter().map(|b| b.match_id).collect();
    if match_ids.is_empty() {
        return Ok(Vec::new());
    }
    let durations: HashMap<Uuid, i32> = matches::Entity::find()
        .filter(matches::Column::Id.is_in(match_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| (m.id, m.duration_minutes))
        .collect();

    Ok(bookings
        .iter()
        .filter_map(|b| {
            b.checked_in_at.map(|at| GuestPresence {
                checked_in_at: at.with_timezone(&Utc),
                duration_minutes: durations
                    .get(&b.match_id)
                    .copied()
                    .unwrap_or(DEFAULT_DURATION_MINUTES),
                guests: b.guests_count,
            })
        })
        .collect())
}

async fn section_occupancy<C: ConnectionTrait>(
    conn: &C,
    sections: &[seating_section::Model],
    bookings: &[booking::Model],
) -> AppResult<Vec<SectionOccupancy>> {
    let status_by_booking: HashMap<Uuid, BookingStatus> =
        bookings.iter().map(|b| (b.id, b.status)).collect();

    let holds = if status_by_booking.is_empty() {
        Vec::new()
    } else {
        booking_seat::Entity::find()
            .filter(booking_seat::Column::BookingId.is_in(status_by_booking.keys().copied()))
            .filter(queries::hold_active())
            .all(conn)
            .await?
    };
    let section_of_seat: HashMap<Uuid, Uuid> = if holds.is_empty() {
        HashMap::new()
    } else {
        seat::Entity::find()
            .filter(seat::Column::Id.is_in(holds.iter().map(|h| h.seat_id)))
            .all(conn)
            .await?
            .into_iter()
            .map(|s| (s.id, s.section_id))
            .collect()
    };

    let mut occupied: HashMap<Uuid, i32> = HashMap::new();
    let mut reserved: HashMap<Uuid, i32> = HashMap::new();
    for hold in &holds {
        let Some(section_id) = section_of_seat.get(&hold.seat_id) else {
            continue;
        };
        match status_by_booking.get(&hold.booking_id) {
            Some(BookingStatus::CheckedIn) => *occupied.entry(*section_id).or_default() += 1,
            Some(BookingStatus::Confirmed) => *reserved.entry(*section_id).or_default() += 1,
            _ => {}
        }
    }

    Ok(sections
        .iter()
        .map(|section| {
            let taken = occupied.get(&section.id).copied().unwrap_or(0);
            SectionOccupancy {
                section_id: section.id,
                name: section.name.clone(),
                total_seats: section.total_seats,
                occupied: taken,
                reserved: reserved.get(&section.id).copied().unwrap_or(0),
                occupancy_percentage: occupancy_percentage(f64::from(taken), section.total_seats),
            }
        })
        .collect())
}

/// Builds the live occupancy report for a branch on the UTC day of `now`.
pub async fn branch_occupancy<C: ConnectionTrait>(
    conn: &C,
    branch_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<OccupancyReport> {
    let venue = branch::Entity::find_by_id(branch_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    let sections = seating_section::Entity::find()
        .filter(seating_section::Column::BranchId.eq(branch_id))
        .all(conn)
        .await?;
    let capacity = if venue.total_capacity > 0 {
        venue.total_capacity
    } else {
        sections.iter().map(|s| s.total_seats).sum()
    };

    let today = now.date_naive();
    let match_ids: Vec<Uuid> = matches::Entity::find()
        .filter(queries::match_at_branch(branch_id))
        .filter(queries::match_on(today))
        .filter(queries::match_not_cancelled())
        .all(conn)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();

    let todays_bookings = if match_ids.is_empty() {
        Vec::new()
    } else {
        booking::Entity::find()
            .filter(booking::Column::MatchId.is_in(match_ids.iter().copied()))
            .filter(queries::booking_in(&[BookingStatus::Confirmed, BookingStatus::CheckedIn]))
            .all(conn)
            .await?
    };

    let counts = summarize(
        capacity,
        &todays_bookings
            .iter()
            .map(|b| (b.status, b.guests_count))
            .collect::<Vec<_>>(),
    );

    let present: Vec<booking::Model> = todays_bookings
        .iter()
        .filter(|b| b.status == BookingStatus::CheckedIn)
        .cloned()
        .collect();
    let peak_hours = peak_hours(&presences_for(conn, &present).await?, capacity);

    let window_end = today.and_time(NaiveTime::MIN).and_utc();
    let window_start = window_end - Duration::days(HISTORY_DAYS);
    let history = booking::Entity::find()
        .filter(booking::Column::BranchId.eq(branch_id))
        .filter(queries::booking_in(&[BookingStatus::CheckedIn, BookingStatus::Completed]))
        .filter(booking::Column::CheckedInAt.gte(window_start.fixed_offset()))
        .filter(booking::Column::CheckedInAt.lt(window_end.fixed_offset()))
        .all(conn)
        .await?;
    let historical_peaks =
        historical_peaks(&presences_for(conn, &history).await?, capacity, HISTORY_DAYS);

    let sections = section_occupancy(conn, &sections, &todays_bookings).await?;

    Ok(OccupancyReport {
        branch_id,
        generated_at: now,
        matches_today: match_ids.len(),
        counts,
        peak_hours,
        historical_peaks,
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, hour, minute, 0).unwrap()
    }

    #[test]
    fn counts_present_and_expected_guests() {
        let counts = summarize(
            50,
            &[
                (BookingStatus::CheckedIn, 4),
                (BookingStatus::CheckedIn, 2),
                (BookingStatus::Confirmed, 10),
            ],
        );
        assert_eq!(counts.current_guests, 6);
        assert_eq!(counts.reserved, 10);
        assert_eq!(counts.available, 34);
        assert_eq!(counts.occupied_percentage, 12.0);
    }

    #[test]
    fn availability_never_goes_negative() {
        let counts = summarize(5, &[(BookingStatus::Confirmed, 8)]);
        assert_eq!(counts.available, 0);
    }

    #[test]
    fn zero_capacity_reports_zero_percent() {
        let counts = summarize(0, &[(BookingStatus::CheckedIn, 3)]);
        assert_eq!(counts.occupied_percentage, 0.0);
        assert_eq!(occupancy_percentage(1.0, 3), 33.3);
    }

    #[test]
    fn stays_span_every_hour_they_touch() {
        let load = hourly_load(&[GuestPresence {
            checked_in_at: at(19, 45),
            duration_minutes: 120,
            guests: 3,
        }]);
        assert_eq!(load[19], 3.0);
        assert_eq!(load[20], 3.0);
        assert_eq!(load[21], 3.0);
        assert_eq!(load[22], 0.0);
        assert_eq!(load[18], 0.0);
    }

    #[test]
    fn missing_duration_falls_back_to_two_hours() {
        let load = hourly_load(&[GuestPresence {
            checked_in_at: at(20, 0),
            duration_minutes: 0,
            guests: 1,
        }]);
        assert_eq!(load.iter().filter(|g| **g > 0.0).count(), 2);
    }

    #[test]
    fn peaks_rank_by_load_then_hour() {
        let presences = [
            GuestPresence { checked_in_at: at(18, 0), duration_minutes: 60, guests: 5 },
            GuestPresence { checked_in_at: at(20, 0), duration_minutes: 60, guests: 10 },
            GuestPresence { checked_in_at: at(21, 0), duration_minutes: 60, guests: 5 },
            GuestPresence { checked_in_at: at(22, 0), duration_minutes: 60, guests: 2 },
        ];
        let peaks = peak_hours(&presences, 20);
        let hours: Vec<u32> = peaks.iter().map(|p| p.hour).collect();
        assert_eq!(hours, vec![20, 18, 21]);
        assert_eq!(peaks[0].occupancy_percentage, 50.0);
    }

    #[test]
    fn history_averages_over_the_window() {
        let presences: Vec<GuestPresence> = (0..7)
            .map(|day| GuestPresence {
                checked_in_at: at(20, 0) - Duration::days(day),
                duration_minutes: 60,
                guests: 7,
            })
            .collect();
        let peaks = historical_peaks(&presences, 10, 7);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].hour, 20);
        assert_eq!(peaks[0].guests, 7.0);
        assert_eq!(peaks[0].occupancy_percentage, 70.0);
    }
}
