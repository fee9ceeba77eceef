pub mod booking;
pub mod booking_seat;
pub mod branch;
pub mod cafe;
pub mod cafe_subscription;
pub mod loyalty_card;
pub mod loyalty_transaction;
pub mod matches;
pub mod offer;
pub mod payment;
pub mod qr_scan_log;
pub mod seat;
pub mod seating_section;
pub mod staff_member;
pub mod subscription_plan;
pub mod team;
