use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "live")]
    Live,
    #[sea_orm(string_value = "finished")]
    Finished,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl MatchStatus {
    /// Forward-only transitions; `cancelled` and `finished` are terminal.
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, next),
            (Draft, Upcoming)
                | (Upcoming, Live)
                | (Live, Finished)
                | (Draft, Cancelled)
                | (Upcoming, Cancelled)
                | (Live, Cancelled)
        )
    }

    pub fn is_bookable(self) -> bool {
        matches!(self, MatchStatus::Upcoming | MatchStatus::Live)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub branch_id: Uuid,
    pub home_team_id: i32,
    pub away_team_id: i32,
    pub match_date: Date,
    pub kick_off: Time,
    pub status: MatchStatus,
    /// Seat capacity the match was created with.
    pub total_seats: i32,
    pub seats_available: i32,
    pub price_per_seat: f64,
    pub currency: String,
    pub duration_minutes: i32,
    pub is_published: bool,
    pub booking_opens_at: Option<DateTimeWithTimeZone>,
    pub booking_closes_at: Option<DateTimeWithTimeZone>,
    pub last_reminder_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Kick-off as a UTC instant (date and kick-off time combined).
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.match_date.and_time(self.kick_off).and_utc()
    }

    /// Returns the reason booking is refused at `now`, if it is.
    pub fn booking_window_error(&self, now: DateTime<Utc>) -> Option<String> {
        if !self.is_published {
            return Some("Match is not published".to_string());
        }
        if !self.status.is_bookable() {
            return Some(format!("Match is {:?} and not open for booking", self.status));
        }
        if let Some(opens) = self.booking_opens_at {
            if now < opens.with_timezone(&Utc) {
                return Some("Booking window has not opened yet".to_string());
            }
        }
        if let Some(closes) = self.booking_closes_at {
            if now > closes.with_timezone(&Utc) {
                return Some("Booking window is closed".to_string());
            }
        }
        None
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id"
    )]
    Branch,
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::HomeTeamId",
        to = "super::team::Column::Id"
    )]
    HomeTeam,
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::AwayTeamId",
        to = "super::team::Column::Id"
    )]
    AwayTeam,
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::MatchStatus::*;

    #[test]
    fn status_moves_forward_only() {
        assert!(Draft.can_transition_to(Upcoming));
        assert!(Upcoming.can_transition_to(Live));
        assert!(Live.can_transition_to(Finished));
        assert!(!Live.can_transition_to(Upcoming));
        assert!(!Finished.can_transition_to(Live));
        assert!(!Draft.can_transition_to(Finished));
    }

    #[test]
    fn cancelled_is_reachable_until_finished() {
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Upcoming.can_transition_to(Cancelled));
        assert!(Live.can_transition_to(Cancelled));
        assert!(!Finished.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Upcoming));
    }
}
