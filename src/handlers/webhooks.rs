//! HTTP handler for payment processor webhooks.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde_json::{Value, json};

use crate::{
    app::AppState,
    error::AppError,
    services::booking_service::{self, StripeEvent},
};

/// Receive a Stripe event.
///
/// # Headers
///
/// - `Stripe-Signature: t=<unix seconds>,v1=<hex hmac>`
///
/// # Response
///
/// - **Success (200 OK)**: `{"received": true}`, also for ignored event types
/// - **Error (400)**: bad signature or body
/// - **Error (503)**: no signing secret configured
/// - **Error (500)**: database error (the processor will redeliver)
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let secret = state
        .booking
        .webhook_secret
        .as_deref()
        .ok_or(AppError::WebhookNotConfigured)?;

    let signature = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok());
    booking_service::verify_signature(&body, signature, secret, booking_service::now())?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed event: {e}")))?;
    booking_service::process_event(state.store.as_ref(), &state.booking, event).await?;

    Ok(Json(json!({ "received": true })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        app::router,
        services::booking_service::{now, sign},
        testutils::{InMemoryStore, RecordingProcessor, WEBHOOK_SECRET, app_state},
    };

    fn event_body() -> String {
        serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_1",
                "amount": 5000,
                "currency": "usd",
                "metadata": {
                    "name": "Jane Doe",
                    "email": "jane@example.com",
                    "appointment_time": "10:00",
                    "appointment_date": "2026-10-18"
                }
            }}
        })
        .to_string()
    }

    fn delivery(body: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("Stripe-Signature", signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn signed_success_event_creates_user_and_booking() {
        let store = Arc::new(InMemoryStore::default());
        let app = router(app_state(store.clone(), Arc::new(RecordingProcessor::succeeding())));

        let body = event_body();
        let signature = sign(body.as_bytes(), WEBHOOK_SECRET, now());

        let response = app
            .clone()
            .oneshot(delivery(&body, &signature))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Redelivery is acknowledged without a second row
        let response = app.oneshot(delivery(&body, &signature)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(store.users().len(), 1);
        assert_eq!(store.bookings().len(), 1);
        assert_eq!(store.bookings()[0].payment_intent_id, "pi_1");
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let app = router(app_state(store.clone(), Arc::new(RecordingProcessor::succeeding())));

        let body = event_body();
        let signature = sign(body.as_bytes(), "whsec_wrong", now());
        let response = app.oneshot(delivery(&body, &signature)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.bookings().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_secret_is_unavailable() {
        let store = Arc::new(InMemoryStore::default());
        let mut state = app_state(store, Arc::new(RecordingProcessor::succeeding()));
        let mut settings = (*state.booking).clone();
        settings.webhook_secret = None;
        state.booking = Arc::new(settings);

        let body = event_body();
        let signature = sign(body.as_bytes(), WEBHOOK_SECRET, now());
        let response = router(state)
            .oneshot(delivery(&body, &signature))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
