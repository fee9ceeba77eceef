use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Side effects produced by lifecycle operations, dispatched by the caller
/// once the owning transaction has committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingConfirmed {
        booking_id: Uuid,
        code: String,
        user_id: Uuid,
        match_id: Uuid,
        branch_id: Uuid,
        seats: usize,
        total_amount: f64,
    },
    BookingCancelled {
        booking_id: Uuid,
        user_id: Uuid,
        match_id: Uuid,
        branch_id: Uuid,
        refunded: bool,
        reason: Option<String>,
    },
    BookingCheckedIn {
        booking_id: Uuid,
        user_id: Uuid,
        match_id: Uuid,
        branch_id: Uuid,
        checked_in_at: DateTime<Utc>,
    },
    /// The only notice a user gets when a match is called off, covering
    /// all of their bookings and refunds on it.
    MatchCancelled {
        match_id: Uuid,
        branch_id: Uuid,
        user_id: Uuid,
        bookings_cancelled: usize,
        refunded_amount: f64,
        refunds_failed: usize,
    },
    PaymentCaptured {
        payment_id: Uuid,
        booking_id: Uuid,
        user_id: Uuid,
        amount: f64,
    },
    PaymentRefunded {
        payment_id: Uuid,
        booking_id: Uuid,
        user_id: Uuid,
        amount: f64,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BookingConfirmed { .. } => "booking_confirmed",
            DomainEvent::BookingCancelled { .. } => "booking_cancelled",
            DomainEvent::BookingCheckedIn { .. } => "booking_checked_in",
            DomainEvent::MatchCancelled { .. } => "match_cancelled",
            DomainEvent::PaymentCaptured { .. } => "payment_captured",
            DomainEvent::PaymentRefunded { .. } => "payment_refunded",
        }
    }

    /// User the event is delivered to.
    pub fn recipient(&self) -> Uuid {
        match self {
            DomainEvent::BookingConfirmed { user_id, .. }
            | DomainEvent::BookingCancelled { user_id, .. }
            | DomainEvent::BookingCheckedIn { user_id, .. }
            | DomainEvent::MatchCancelled { user_id, .. }
            | DomainEvent::PaymentCaptured { user_id, .. }
            | DomainEvent::PaymentRefunded { user_id, .. } => *user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_a_type_tag() {
        let event = DomainEvent::MatchCancelled {
            match_id: Uuid::nil(),
            branch_id: Uuid::nil(),
            user_id: Uuid::nil(),
            bookings_cancelled: 2,
            refunded_amount: 157.5,
            refunds_failed: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "match_cancelled");
        assert_eq!(value["bookings_cancelled"], 2);
        assert_eq!(event.name(), "match_cancelled");
    }
}
