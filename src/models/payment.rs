//! Payment intent models shared by the Stripe client, the payment-intent
//! endpoint and the booking page.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::slot::AppointmentSlot;

/// Metadata keys attached to a payment intent so the webhook can rebuild the booking.
pub mod metadata_keys {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const APPOINTMENT_TIME: &str = "appointment_time";
    pub const APPOINTMENT_DATE: &str = "appointment_date";
}

/// What the application asks the processor to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Amount in minor currency units (cents)
    pub amount_cents: i64,
    /// Lowercase ISO 4217 code
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

/// The subset of a Stripe PaymentIntent this service reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub status: String,
}

/// Parameters for confirming an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPaymentParams {
    /// Card payment method tokenized in the browser (`pm_...`)
    pub payment_method: Option<String>,
    /// Where the processor sends the browser when the payment needs an extra step
    pub return_url: String,
}

/// Result of a confirmation attempt.
///
/// `Failed` covers errors the processor reports about the payment itself
/// (declines, validation). Transport and server failures are returned as
/// `PaymentError` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentConfirmation {
    Succeeded,
    Failed { message: String },
    RequiresRedirect { url: String },
    /// Still `processing` or similar; the webhook will settle it.
    Pending { status: String },
}

/// Extract the intent id (`pi_...`) from a client secret (`pi_..._secret_...`).
pub fn intent_id_from_client_secret(client_secret: &str) -> Option<&str> {
    client_secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| !id.is_empty())
}

/// Request body for `POST /api/create-payment-intent`.
///
/// Both shapes seen from the booking page are accepted: a bare `amount`, or
/// the booking details. Missing amount falls back to the configured price.
///
/// ```json
/// { "amount": 5000 }
/// { "name": "Jane Doe", "email": "jane@example.com", "selectedTime": "10:00" }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub amount: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "selectedTime")]
    pub selected_time: Option<AppointmentSlot>,
}

/// Response body for `POST /api/create-payment-intent`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
}
