use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "checked_in")]
    CheckedIn,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl BookingStatus {
    /// The booking state machine. Every status change goes through here.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, CheckedIn)
                | (Confirmed, CheckedIn)
                | (CheckedIn, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (CheckedIn, Cancelled)
        )
    }

    /// Statuses a booking may leave to enter `next`.
    pub fn sources_of(next: BookingStatus) -> Vec<BookingStatus> {
        <Self as sea_orm::Iterable>::iter()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Booked but not yet seated.
    pub fn awaiting_arrival() -> [BookingStatus; 2] {
        [BookingStatus::Pending, BookingStatus::Confirmed]
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub branch_id: Uuid,
    pub guests_count: i32,
    pub status: BookingStatus,
    pub subtotal: f64,
    pub service_fee: f64,
    pub total_amount: f64,
    pub currency: String,
    pub special_requests: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub qr_payload: String,
    pub loyalty_points_awarded: i32,
    pub checked_in_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::matches::Entity",
        from = "Column::MatchId",
        to = "super::matches::Column::Id"
    )]
    Match,
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id"
    )]
    Branch,
    #[sea_orm(has_many = "super::booking_seat::Entity")]
    Seats,
    #[sea_orm(has_one = "super::payment::Entity")]
    Payment,
}

impl Related<super::matches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Match.def()
    }
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::booking_seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::BookingStatus::*;

    #[test]
    fn lifecycle_follows_the_happy_path() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(CheckedIn));
    }

    #[test]
    fn cancellation_is_blocked_once_completed() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(CheckedIn.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn sources_follow_the_table() {
        assert_eq!(super::BookingStatus::sources_of(Completed), vec![CheckedIn]);
        assert_eq!(
            super::BookingStatus::sources_of(Cancelled),
            vec![Pending, Confirmed, CheckedIn]
        );
        assert_eq!(super::BookingStatus::sources_of(CheckedIn), vec![Pending, Confirmed]);
    }

    #[test]
    fn terminal_statuses() {
        assert!(Cancelled.is_terminal());
        assert!(Completed.is_terminal());
        assert!(!CheckedIn.is_terminal());
    }
}
