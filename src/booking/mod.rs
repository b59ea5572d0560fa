//! The booking page.
//!
//! `BookingPage` is the state behind one browser's booking form. A
//! submission runs in three steps so the session lock is never held while
//! the payment processor is being called:
//!
//! 1. [`BookingPage::begin_submit`] validates the form and sets `loading`
//! 2. [`pay`] creates and confirms the payment intent
//! 3. [`BookingPage::finish_submit`] applies the outcome and clears `loading`

pub mod render;
pub mod session;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    config::BookingSettings,
    error::AppError,
    models::{
        booking::BookingDetails,
        payment::{ConfirmPaymentParams, PaymentConfirmation},
        slot::{AppointmentSlot, default_slots},
    },
    services::payment_service::{PaymentProcessor, create_booking_intent},
};

pub const SELECT_TIME_ALERT: &str = "Please select an appointment time.";
pub const SLOT_UNAVAILABLE_ALERT: &str = "That appointment time is no longer available.";
pub const IN_PROGRESS_ALERT: &str = "Your booking is already being processed.";
pub const CONFIRMED_ALERT: &str = "Booking Confirmed!";
pub const GENERIC_FAILURE_ALERT: &str = "An error occurred during payment processing.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Error,
}

/// Form fields posted by the booking page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// `HH:MM`, empty when the placeholder option is still selected
    pub time: Option<String>,
    /// Card payment method tokenized by Stripe.js in the browser
    pub payment_method: Option<String>,
}

/// A submission that passed the guards and is waiting on the processor.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub details: BookingDetails,
    pub payment_method: Option<String>,
}

/// What the handler should send back after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Render,
    /// The processor needs the browser for an extra step (3-D Secure, bank redirect)
    Redirect(String),
}

/// State of one booking form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPage {
    pub name: String,
    pub email: String,
    pub selected_time: Option<AppointmentSlot>,
    pub loading: bool,
    pub payment_status: Option<PaymentStatus>,
    pub available_times: Vec<AppointmentSlot>,
    pub client_secret: Option<String>,
    /// One-shot message shown above the form
    pub alert: Option<String>,
}

impl Default for BookingPage {
    fn default() -> Self {
        Self::mount()
    }
}

impl BookingPage {
    /// Fresh form with the full slot list.
    pub fn mount() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            selected_time: None,
            loading: false,
            payment_status: None,
            available_times: default_slots(),
            client_secret: None,
            alert: None,
        }
    }

    /// Handle `?payment_status=...` after the processor sends the browser back.
    ///
    /// Only marks success; the slot list is left as is.
    pub fn apply_return_status(&mut self, payment_status: Option<&str>) {
        if payment_status == Some("success") {
            self.payment_status = Some(PaymentStatus::Success);
        }
    }

    /// Take the alert for rendering; it is shown once.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// Guard phase of a submission.
    ///
    /// Returns `None` (with an alert set) when nothing should be sent to the
    /// processor. Otherwise `loading` is set and the previous status cleared.
    pub fn begin_submit(&mut self, form: &BookingForm, today: NaiveDate) -> Option<PendingSubmission> {
        if self.loading {
            self.alert = Some(IN_PROGRESS_ALERT.to_string());
            return None;
        }

        self.name = form.name.trim().to_string();
        self.email = form.email.trim().to_string();

        let requested = form.time.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let Some(requested) = requested else {
            self.selected_time = None;
            self.alert = Some(SELECT_TIME_ALERT.to_string());
            return None;
        };

        let slot = requested
            .parse::<AppointmentSlot>()
            .ok()
            .filter(|slot| self.available_times.contains(slot));
        let Some(slot) = slot else {
            self.selected_time = None;
            self.alert = Some(SLOT_UNAVAILABLE_ALERT.to_string());
            return None;
        };

        self.selected_time = Some(slot);
        self.loading = true;
        self.payment_status = None;
        self.alert = None;

        Some(PendingSubmission {
            details: BookingDetails {
                name: self.name.clone(),
                email: self.email.clone(),
                slot,
                date: today,
            },
            payment_method: form.payment_method.clone(),
        })
    }

    /// Apply the processor's answer. `loading` is always cleared.
    pub fn finish_submit(
        &mut self,
        pending: &PendingSubmission,
        result: Result<(String, PaymentConfirmation), AppError>,
    ) -> SubmitOutcome {
        self.loading = false;

        match result {
            Ok((client_secret, confirmation)) => {
                self.client_secret = Some(client_secret);
                match confirmation {
                    PaymentConfirmation::Succeeded => {
                        tracing::info!("Payment succeeded for {}", pending.details.slot);
                        self.payment_status = Some(PaymentStatus::Success);
                        self.alert = Some(CONFIRMED_ALERT.to_string());
                        let booked = pending.details.slot;
                        self.available_times.retain(|slot| *slot != booked);
                        self.selected_time = None;
                        SubmitOutcome::Render
                    }
                    PaymentConfirmation::Failed { message } => {
                        tracing::warn!("Payment failed: {}", message);
                        self.payment_status = Some(PaymentStatus::Error);
                        self.alert = Some(format!("Payment failed: {message}"));
                        SubmitOutcome::Render
                    }
                    PaymentConfirmation::RequiresRedirect { url } => SubmitOutcome::Redirect(url),
                    PaymentConfirmation::Pending { status } => {
                        tracing::info!("Payment still {}", status);
                        SubmitOutcome::Render
                    }
                }
            }
            Err(e) => {
                tracing::error!("Payment Error: {}", e);
                self.payment_status = Some(PaymentStatus::Error);
                self.alert = Some(GENERIC_FAILURE_ALERT.to_string());
                SubmitOutcome::Render
            }
        }
    }

    /// Settle a submission whose payment step never produced a result.
    pub fn abort_submit(&mut self) {
        self.loading = false;
        self.payment_status = Some(PaymentStatus::Error);
        self.alert = Some(GENERIC_FAILURE_ALERT.to_string());
    }

    /// Run a whole submission against `processor` while holding the page.
    #[cfg(test)]
    pub async fn submit(
        &mut self,
        form: &BookingForm,
        processor: &dyn PaymentProcessor,
        settings: &BookingSettings,
        today: NaiveDate,
    ) -> SubmitOutcome {
        let Some(pending) = self.begin_submit(form, today) else {
            return SubmitOutcome::Render;
        };
        let result = pay(processor, settings, &pending).await;
        self.finish_submit(&pending, result)
    }
}

/// Create the intent for `pending` and confirm it.
///
/// Returns the client secret with the confirmation outcome.
pub async fn pay(
    processor: &dyn PaymentProcessor,
    settings: &BookingSettings,
    pending: &PendingSubmission,
) -> Result<(String, PaymentConfirmation), AppError> {
    let intent =
        create_booking_intent(processor, settings, None, pending.details.to_metadata()).await?;

    let params = ConfirmPaymentParams {
        payment_method: pending.payment_method.clone(),
        return_url: settings.return_url.clone(),
    };
    let confirmation = processor
        .confirm_payment(&intent.client_secret, &params)
        .await?;

    Ok((intent.client_secret, confirmation))
}
