pub mod admission;
pub mod booking;
pub mod cafes;
pub mod checkin;
pub mod events;
pub mod loyalty;
pub mod matches;
pub mod occupancy;
pub mod queries;
pub mod seats;
