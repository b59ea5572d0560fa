//! Booking models.
//!
//! A `Booking` is the durable reservation written when the processor reports
//! a successful payment. The booking page itself never reads this table.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    payment::metadata_keys,
    slot::AppointmentSlot,
    user::NewUser,
};

/// What the customer asked for on the booking page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDetails {
    pub name: String,
    pub email: String,
    pub slot: AppointmentSlot,
    pub date: NaiveDate,
}

impl BookingDetails {
    /// Encode as payment intent metadata.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (metadata_keys::NAME.to_string(), self.name.clone()),
            (metadata_keys::EMAIL.to_string(), self.email.clone()),
            (
                metadata_keys::APPOINTMENT_TIME.to_string(),
                self.slot.to_string(),
            ),
            (
                metadata_keys::APPOINTMENT_DATE.to_string(),
                self.date.format("%Y-%m-%d").to_string(),
            ),
        ])
    }

    /// Decode from payment intent metadata; `None` if anything is missing or malformed.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Option<Self> {
        let name = metadata.get(metadata_keys::NAME)?.trim();
        let email = metadata.get(metadata_keys::EMAIL)?.trim();
        if name.is_empty() || email.is_empty() {
            return None;
        }
        let slot = metadata.get(metadata_keys::APPOINTMENT_TIME)?.parse().ok()?;
        let date =
            NaiveDate::parse_from_str(metadata.get(metadata_keys::APPOINTMENT_DATE)?, "%Y-%m-%d")
                .ok()?;

        Some(Self {
            name: name.to_string(),
            email: email.to_string(),
            slot,
            date,
        })
    }
}

/// A paid booking to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub payment_intent_id: String,
    pub user: NewUser,
    pub appointment_date: NaiveDate,
    pub appointment_time: AppointmentSlot,
    pub amount_cents: i64,
    pub currency: String,
}

/// Represents a booking record from the database.
///
/// # Database Table
///
/// Maps to the `bookings` table. `payment_intent_id` is unique, and so is the
/// `(appointment_date, appointment_time)` pair.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: i32,
    pub payment_intent_id: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of recording a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingRecord {
    Created(Booking),
    /// The payment intent was already recorded (webhook redelivery).
    AlreadyRecorded,
    /// Someone else holds the `(date, time)` pair; nothing was written.
    SlotTaken,
}
