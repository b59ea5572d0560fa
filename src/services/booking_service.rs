//! Payment webhook processing.
//!
//! A booking becomes durable only when the processor tells us, through a
//! signed webhook, that its payment intent succeeded. The user row and the
//! booking row are written together in one database transaction.

use std::collections::BTreeMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    config::BookingSettings,
    error::AppError,
    models::{
        booking::{BookingDetails, BookingRecord, NewBooking},
        user::NewUser,
    },
    services::store::BookingStore,
};

type HmacSha256 = Hmac<Sha256>;

/// Deliveries signed longer ago than this are rejected as replays.
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// The outer Stripe event object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    /// Shape depends on `event_type`
    pub object: serde_json::Value,
}

/// `data.object` for `payment_intent.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// What happened to a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    /// Succeeded intent without usable booking metadata (e.g. created by `{amount}` only)
    MissingDetails,
    /// Amount or currency differs from the configured booking price
    PriceMismatch,
    Recorded(BookingRecord),
}

/// Verify a `Stripe-Signature` header against the raw body.
///
/// Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=...]`. The signed
/// string is `"<t>.<body>"`. Any one matching `v1` entry is enough.
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    now: i64,
) -> Result<(), AppError> {
    let header = header
        .ok_or_else(|| AppError::InvalidSignature("missing Stripe-Signature header".to_string()))?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::InvalidSignature("missing timestamp".to_string()))?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| AppError::InvalidSignature("invalid timestamp".to_string()))?;
    if now.abs_diff(signed_at) > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }
    if signatures.is_empty() {
        return Err(AppError::InvalidSignature("missing v1 signature".to_string()));
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mac = signing_mac(secret, timestamp, payload)?;
        // verify_slice compares in constant time
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::InvalidSignature("signature mismatch".to_string()))
}

fn signing_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::InvalidSignature("unusable webhook secret".to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Act on a verified event.
///
/// Only `payment_intent.succeeded` does anything; other types are acknowledged.
/// An intent is recorded only when it was charged at the configured price.
pub async fn process_event(
    store: &dyn BookingStore,
    settings: &BookingSettings,
    event: StripeEvent,
) -> Result<EventOutcome, AppError> {
    tracing::info!("Processing Stripe event {} ({})", event.id, event.event_type);

    if event.event_type != "payment_intent.succeeded" {
        return Ok(EventOutcome::Ignored);
    }

    let intent: PaymentIntentObject = serde_json::from_value(event.data.object)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed payment intent: {e}")))?;

    let Some(details) = BookingDetails::from_metadata(&intent.metadata) else {
        tracing::warn!(
            "Payment intent {} succeeded without booking details; nothing recorded",
            intent.id
        );
        return Ok(EventOutcome::MissingDetails);
    };

    if intent.amount != settings.amount_cents
        || !intent.currency.eq_ignore_ascii_case(&settings.currency)
    {
        tracing::warn!(
            "Payment intent {} charged {} {} instead of {} {}; booking not recorded",
            intent.id,
            intent.amount,
            intent.currency,
            settings.amount_cents,
            settings.currency
        );
        return Ok(EventOutcome::PriceMismatch);
    }

    let booking = NewBooking {
        payment_intent_id: intent.id.clone(),
        user: NewUser {
            name: details.name,
            email: details.email,
        },
        appointment_date: details.date,
        appointment_time: details.slot,
        amount_cents: intent.amount,
        currency: settings.currency.clone(),
    };

    let record = store.record_booking(booking).await?;
    match &record {
        BookingRecord::Created(row) => tracing::info!(
            "Booking {} recorded for {} {} (intent {})",
            row.id,
            row.appointment_date,
            row.appointment_time,
            intent.id
        ),
        BookingRecord::AlreadyRecorded => {
            tracing::info!("Payment intent {} already recorded", intent.id)
        }
        BookingRecord::SlotTaken => tracing::warn!(
            "Slot {} {} already reserved; payment intent {} needs a manual refund",
            details.date,
            details.slot,
            intent.id
        ),
    }

    Ok(EventOutcome::Recorded(record))
}

/// Current unix time, for `verify_signature`.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
pub(crate) fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let timestamp = timestamp.to_string();
    let mac = signing_mac(secret, &timestamp, payload).unwrap();
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{InMemoryStore, booking_settings};
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn succeeded_event(intent_id: &str, time: &str) -> StripeEvent {
        charged_event(intent_id, time, 5000, "usd")
    }

    fn charged_event(intent_id: &str, time: &str, amount: i64, currency: &str) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": intent_id,
                "amount": amount,
                "currency": currency,
                "metadata": {
                    "name": "Jane Doe",
                    "email": "jane@example.com",
                    "appointment_time": time,
                    "appointment_date": "2026-10-18"
                }
            }}
        }))
        .unwrap()
    }

    #[test]
    fn accepts_a_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(body, SECRET, 1_700_000_000);
        assert!(verify_signature(body, Some(&header), SECRET, 1_700_000_010).is_ok());
    }

    #[test]
    fn accepts_when_any_v1_matches() {
        let body = br#"{"id":"evt_1"}"#;
        let valid = sign(body, SECRET, 1_700_000_000);
        let v1 = valid.split_once(",v1=").unwrap().1;
        let header = format!("t=1700000000,v1=deadbeef,v1={v1}");
        assert!(verify_signature(body, Some(&header), SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_tampering_staleness_and_missing_header() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(body, SECRET, 1_700_000_000);

        assert!(verify_signature(br#"{"id":"evt_2"}"#, Some(&header), SECRET, 1_700_000_000).is_err());
        assert!(verify_signature(body, Some(&header), "whsec_other", 1_700_000_000).is_err());
        assert!(verify_signature(body, Some(&header), SECRET, 1_700_000_000 + 301).is_err());
        assert!(verify_signature(body, None, SECRET, 1_700_000_000).is_err());
        assert!(verify_signature(body, Some("t=1700000000"), SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn extreme_timestamps_are_rejected_not_overflowed() {
        let body = b"{}";
        for signed_at in [i64::MIN, i64::MAX] {
            let header = format!("t={signed_at},v1=00");
            let err = verify_signature(body, Some(&header), SECRET, now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidSignature(_)));
        }

        let header = format!("t={},v1=00", i64::MAX);
        assert!(verify_signature(body, Some(&header), SECRET, i64::MIN).is_err());
    }

    #[tokio::test]
    async fn succeeded_intent_records_user_and_booking_once() {
        let store = InMemoryStore::default();

        let first = process_event(&store, &booking_settings(), succeeded_event("pi_1", "10:00"))
            .await
            .unwrap();
        assert!(matches!(first, EventOutcome::Recorded(BookingRecord::Created(_))));

        let redelivered = process_event(&store, &booking_settings(), succeeded_event("pi_1", "10:00"))
            .await
            .unwrap();
        assert_eq!(
            redelivered,
            EventOutcome::Recorded(BookingRecord::AlreadyRecorded)
        );

        assert_eq!(store.users().len(), 1);
        assert_eq!(store.users()[0].email, "jane@example.com");
        assert_eq!(store.bookings().len(), 1);
        assert_eq!(store.bookings()[0].amount_cents, 5000);
    }

    #[tokio::test]
    async fn second_payment_for_same_slot_is_not_recorded() {
        let store = InMemoryStore::default();

        process_event(&store, &booking_settings(), succeeded_event("pi_1", "10:00"))
            .await
            .unwrap();
        let second = process_event(&store, &booking_settings(), succeeded_event("pi_2", "10:00"))
            .await
            .unwrap();

        assert_eq!(second, EventOutcome::Recorded(BookingRecord::SlotTaken));
        assert_eq!(store.bookings().len(), 1);
        assert_eq!(store.users().len(), 1);
    }

    #[tokio::test]
    async fn off_price_or_off_schedule_intents_are_not_recorded() {
        let store = InMemoryStore::default();
        let settings = booking_settings();

        let one_cent = process_event(&store, &settings, charged_event("pi_1", "10:00", 1, "usd"))
            .await
            .unwrap();
        assert_eq!(one_cent, EventOutcome::PriceMismatch);

        let wrong_currency =
            process_event(&store, &settings, charged_event("pi_2", "10:00", 5000, "eur"))
                .await
                .unwrap();
        assert_eq!(wrong_currency, EventOutcome::PriceMismatch);

        let off_schedule = process_event(&store, &settings, succeeded_event("pi_3", "03:17"))
            .await
            .unwrap();
        assert_eq!(off_schedule, EventOutcome::MissingDetails);

        assert!(store.bookings().is_empty());
        assert!(store.users().is_empty());
    }

    #[tokio::test]
    async fn other_events_and_bare_intents_are_acknowledged() {
        let store = InMemoryStore::default();

        let other: StripeEvent = serde_json::from_value(json!({
            "id": "evt_2",
            "type": "charge.refunded",
            "data": { "object": {} }
        }))
        .unwrap();
        assert_eq!(process_event(&store, &booking_settings(), other).await.unwrap(), EventOutcome::Ignored);

        let bare: StripeEvent = serde_json::from_value(json!({
            "id": "evt_3",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_9", "amount": 5000, "currency": "usd" } }
        }))
        .unwrap();
        assert_eq!(
            process_event(&store, &booking_settings(), bare).await.unwrap(),
            EventOutcome::MissingDetails
        );
        assert!(store.bookings().is_empty());
    }
}
