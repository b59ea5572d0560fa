//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON or form body, query, cookies)
//! 2. Delegates to services or the booking page state
//! 3. Returns HTTP response (JSON, HTML, status code)

/// Health check endpoint
pub mod health;
/// Booking page
pub mod page;
/// Payment intent creation
pub mod payment_intents;
/// Users resource
pub mod users;
/// Payment processor webhooks
pub mod webhooks;
