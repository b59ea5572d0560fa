//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Validation Errors**: Invalid request data
/// - **Payment Errors**: The payment processor failed or was unreachable
/// - **Webhook Errors**: Unsigned, forged or stale webhook deliveries
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 500. Details are logged, never sent to the client.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("{0}")]
    InvalidRequest(String),

    /// Request body was not valid JSON for the endpoint.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error(transparent)]
    InvalidJson(#[from] JsonRejection),

    /// Payment processor call failed.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Payment processor error: {0}")]
    Payment(#[from] PaymentError),

    /// Webhook signature missing, malformed, stale or wrong.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// No webhook signing secret is configured.
    ///
    /// Returns HTTP 503 Service Unavailable.
    #[error("Webhook endpoint is not configured")]
    WebhookNotConfigured,
}

/// Errors raised by the payment processor client.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Network or TLS failure talking to the processor
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Processor answered with a non-success status
    #[error("processor returned {status_code}: {message}")]
    Api { status_code: u16, message: String },

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Client secret does not contain a payment intent id
    #[error("malformed client secret")]
    InvalidClientSecret,
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// { "error": "Human-readable error message" }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidRequest`, `InvalidJson`, `InvalidSignature` → 400 Bad Request
/// - `Payment` → 502 Bad Gateway (hides details from client)
/// - `WebhookNotConfigured` → 503 Service Unavailable
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::InvalidRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidJson(ref rejection) => {
                (StatusCode::BAD_REQUEST, rejection.body_text())
            }
            AppError::Payment(ref e) => {
                tracing::error!("Payment processor error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment processor error".to_string(),
                )
            }
            AppError::InvalidSignature(ref reason) => {
                tracing::warn!("Rejected webhook: {}", reason);
                (StatusCode::BAD_REQUEST, "Invalid signature".to_string())
            }
            AppError::WebhookNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
