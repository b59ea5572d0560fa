//! Data models representing database entities and wire types.

/// Paid booking records
pub mod booking;
/// Payment intent request/response types
pub mod payment;
/// Fixed appointment slots
pub mod slot;
/// User model
pub mod user;
