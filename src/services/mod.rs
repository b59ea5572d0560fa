//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, the payment processor, and webhook verification.

pub mod booking_service;
pub mod payment_service;
pub mod store;
