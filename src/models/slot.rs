//! Appointment slots.
//!
//! A slot is a time of day drawn from a fixed list. Nothing here is persisted;
//! the booking page keeps its own copy of the list per browser session.
//!
//! Parsing (`FromStr` and `Deserialize`) is the only way to build a slot from
//! outside input, and it refuses any time that is not on the list.

use std::{fmt, str::FromStr};

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opening hours offered on the booking page (on the hour, lunch at 12 skipped).
const SLOT_HOURS: [u32; 6] = [9, 10, 11, 13, 14, 15];

/// One of the offered times of day.
///
/// Wire format is `HH:MM`; [`AppointmentSlot::label`] gives the `9:00 AM`
/// form shown to customers. A well-formed time outside the offered hours
/// fails to parse with [`SlotError::NotOffered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppointmentSlot(NaiveTime);

impl AppointmentSlot {
    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// 12-hour label, e.g. `1:00 PM`.
    pub fn label(&self) -> String {
        self.0.format("%-I:%M %p").to_string()
    }
}

/// Why a string is not a slot.
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("invalid time: {0}")]
    Invalid(#[from] chrono::ParseError),

    #[error("{0} is not an offered appointment time")]
    NotOffered(String),
}

/// The full list of slots, in display order.
pub fn default_slots() -> Vec<AppointmentSlot> {
    SLOT_HOURS
        .iter()
        .filter_map(|hour| NaiveTime::from_hms_opt(*hour, 0, 0))
        .map(AppointmentSlot)
        .collect()
}

impl fmt::Display for AppointmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for AppointmentSlot {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")?;
        let slot = Self(time);
        if default_slots().contains(&slot) {
            Ok(slot)
        } else {
            Err(SlotError::NotOffered(slot.to_string()))
        }
    }
}

impl Serialize for AppointmentSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AppointmentSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
