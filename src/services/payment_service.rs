//! Payment processor integration.
//!
//! `PaymentProcessor` is the seam between the booking flow and Stripe. The
//! production implementation talks to the Stripe REST API with form-encoded
//! requests, authenticating with the secret key as the basic-auth user.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    config::BookingSettings,
    error::{AppError, PaymentError},
    models::payment::{
        ConfirmPaymentParams, PaymentConfirmation, PaymentIntent, PaymentIntentRequest,
        intent_id_from_client_secret,
    },
};

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a payment intent and return it with its client secret.
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Confirm the intent identified by `client_secret`.
    async fn confirm_payment(
        &self,
        client_secret: &str,
        params: &ConfirmPaymentParams,
    ) -> Result<PaymentConfirmation, PaymentError>;
}

/// Create the intent for one booking attempt.
///
/// Shared by `POST /api/create-payment-intent` and the booking page so both
/// price and describe the charge the same way. `amount_cents` overrides the
/// configured price.
///
/// # Errors
///
/// - `InvalidRequest`: amount is zero or negative
/// - `Payment`: the processor rejected the request or was unreachable
pub async fn create_booking_intent(
    processor: &dyn PaymentProcessor,
    settings: &BookingSettings,
    amount_cents: Option<i64>,
    metadata: BTreeMap<String, String>,
) -> Result<PaymentIntent, AppError> {
    let amount_cents = amount_cents.unwrap_or(settings.amount_cents);
    if amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }

    let request = PaymentIntentRequest {
        amount_cents,
        currency: settings.currency.clone(),
        metadata,
    };
    let intent = processor.create_payment_intent(&request).await?;
    tracing::info!(
        "Created payment intent {} for {} {} ({})",
        intent.id,
        amount_cents,
        settings.currency,
        intent.status
    );

    Ok(intent)
}

/// Stripe REST client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfirmedIntent {
    status: String,
    next_action: Option<NextAction>,
    last_payment_error: Option<StripeErrorBody>,
}

#[derive(Debug, Deserialize)]
struct NextAction {
    redirect_to_url: Option<RedirectToUrl>,
}

#[derive(Debug, Deserialize)]
struct RedirectToUrl {
    url: String,
}

impl StripeClient {
    /// Build a client for `api_base` (normally `https://api.stripe.com`).
    ///
    /// # Timeout
    ///
    /// 10 seconds per request, so a slow processor cannot pin a booking session in `loading`.
    pub fn new(api_base: &str, secret_key: &str) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<(StatusCode, String), PaymentError> {
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut form = vec![
            ("amount".to_string(), request.amount_cents.to_string()),
            ("currency".to_string(), request.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        form.extend(
            request
                .metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );

        let (status, body) = self.post_form("/v1/payment_intents", &form).await?;
        if !status.is_success() {
            return Err(PaymentError::Api {
                status_code: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn confirm_payment(
        &self,
        client_secret: &str,
        params: &ConfirmPaymentParams,
    ) -> Result<PaymentConfirmation, PaymentError> {
        let intent_id =
            intent_id_from_client_secret(client_secret).ok_or(PaymentError::InvalidClientSecret)?;

        let mut form = vec![("return_url".to_string(), params.return_url.clone())];
        if let Some(method) = params.payment_method.as_ref().filter(|m| !m.is_empty()) {
            form.push(("payment_method".to_string(), method.clone()));
        }

        let path = format!("/v1/payment_intents/{intent_id}/confirm");
        let (status, body) = self.post_form(&path, &form).await?;
        interpret_confirmation(status, &body)
    }
}

/// Map a confirm response onto the booking flow's outcomes.
///
/// 4xx answers carry a processor-reported reason (decline, missing payment
/// method) and become `Failed`; anything 5xx is an error of the call itself.
fn interpret_confirmation(
    status: StatusCode,
    body: &str,
) -> Result<PaymentConfirmation, PaymentError> {
    if status.is_client_error() {
        return Ok(PaymentConfirmation::Failed {
            message: error_message(body),
        });
    }
    if !status.is_success() {
        return Err(PaymentError::Api {
            status_code: status.as_u16(),
            message: error_message(body),
        });
    }

    let intent: ConfirmedIntent = serde_json::from_str(body)?;
    let confirmation = match intent.status.as_str() {
        "succeeded" => PaymentConfirmation::Succeeded,
        "requires_action" => match intent.next_action.and_then(|a| a.redirect_to_url) {
            Some(redirect) => PaymentConfirmation::RequiresRedirect { url: redirect.url },
            None => PaymentConfirmation::Pending {
                status: intent.status.clone(),
            },
        },
        "requires_payment_method" | "canceled" => PaymentConfirmation::Failed {
            message: intent
                .last_payment_error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "The payment was not completed.".to_string()),
        },
        _ => PaymentConfirmation::Pending {
            status: intent.status.clone(),
        },
    };

    Ok(confirmation)
}

/// Pull `error.message` out of a Stripe error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<StripeErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.to_string())
}
