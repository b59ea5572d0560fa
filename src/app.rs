//! Shared application state and the HTTP router.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::{
    booking::session::SessionStore,
    config::BookingSettings,
    handlers,
    services::{payment_service::PaymentProcessor, store::BookingStore},
};

/// Everything handlers need, cloned cheaply per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub sessions: SessionStore,
    pub booking: Arc<BookingSettings>,
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Booking page
        .route(
            "/",
            get(handlers::page::show_booking_page).post(handlers::page::submit_booking),
        )
        // Users resource; anything but GET/POST gets a 405 with an Allow header
        .route(
            "/api/users",
            get(handlers::users::list_users)
                .post(handlers::users::create_user)
                .fallback(handlers::users::method_not_allowed),
        )
        .route(
            "/api/create-payment-intent",
            post(handlers::payment_intents::create_payment_intent),
        )
        .route(
            "/api/webhooks/stripe",
            post(handlers::webhooks::stripe_webhook),
        )
        .route("/health", get(handlers::health::health_check))
        .layer(CookieManagerLayer::new())
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state)
}
