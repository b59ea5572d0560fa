//! `POST /api/create-payment-intent`

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;

use crate::{
    app::AppState,
    error::AppError,
    models::payment::{CreatePaymentIntentRequest, CreatePaymentIntentResponse, metadata_keys},
    services::payment_service::create_booking_intent,
};

/// Create a payment intent and hand back its client secret.
///
/// # Request Body
///
/// ```json
/// { "amount": 5000 }
/// ```
/// or
/// ```json
/// { "name": "Jane Doe", "email": "jane@example.com", "selectedTime": "10:00" }
/// ```
///
/// Booking details are only attached at the configured price: an `amount`
/// that differs from it cannot be combined with `name`, `email` or
/// `selectedTime`.
///
/// # Response
///
/// - **Success (200 OK)**: `{"clientSecret": "pi_..._secret_..."}`
/// - **Error (400)**: non-positive amount, custom amount with booking
///   details, a `selectedTime` outside the offered slots, or malformed body
/// - **Error (502)**: the payment processor failed
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentIntentResponse>, AppError> {
    let Json(request) = payload?;

    let has_details =
        request.name.is_some() || request.email.is_some() || request.selected_time.is_some();
    let custom_amount = request
        .amount
        .is_some_and(|amount| amount != state.booking.amount_cents);
    if has_details && custom_amount {
        return Err(AppError::InvalidRequest(
            "Booking details can only be sent at the standard price".to_string(),
        ));
    }

    let mut metadata = BTreeMap::new();
    if let Some(name) = request.name.filter(|n| !n.trim().is_empty()) {
        metadata.insert(metadata_keys::NAME.to_string(), name.trim().to_string());
    }
    if let Some(email) = request.email.filter(|e| !e.trim().is_empty()) {
        metadata.insert(metadata_keys::EMAIL.to_string(), email.trim().to_string());
    }
    if let Some(slot) = request.selected_time {
        metadata.insert(metadata_keys::APPOINTMENT_TIME.to_string(), slot.to_string());
        metadata.insert(
            metadata_keys::APPOINTMENT_DATE.to_string(),
            Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        );
    }

    let intent = create_booking_intent(
        state.payments.as_ref(),
        &state.booking,
        request.amount,
        metadata,
    )
    .await?;

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}
