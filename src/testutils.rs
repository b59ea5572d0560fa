//! In-memory collaborators for tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI32, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{
    app::AppState,
    booking::session::SessionStore,
    config::BookingSettings,
    error::PaymentError,
    models::{
        booking::{Booking, BookingRecord, NewBooking},
        payment::{ConfirmPaymentParams, PaymentConfirmation, PaymentIntent, PaymentIntentRequest},
        user::{NewUser, User},
    },
    services::{payment_service::PaymentProcessor, store::BookingStore},
};

pub const WEBHOOK_SECRET: &str = "whsec_test";

pub fn booking_settings() -> BookingSettings {
    BookingSettings {
        publishable_key: "pk_test_123".to_string(),
        amount_cents: 5000,
        currency: "usd".to_string(),
        return_url: "http://localhost:3000/?payment_status=success".to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    }
}

pub fn app_state(store: Arc<InMemoryStore>, processor: Arc<RecordingProcessor>) -> AppState {
    AppState {
        store,
        payments: processor,
        sessions: SessionStore::default(),
        booking: Arc::new(booking_settings()),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: Mutex<Vec<User>>,
    bookings: Mutex<Vec<Booking>>,
    next_id: AtomicI32,
    failing: bool,
}

impl InMemoryStore {
    /// A store whose every call fails like an unreachable database.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }

    fn insert_user(&self, user: NewUser) -> User {
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: user.name,
            email: user.email,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        self.check()?;
        Ok(self.users())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        self.check()?;
        Ok(self.insert_user(user))
    }

    async fn record_booking(&self, booking: NewBooking) -> Result<BookingRecord, sqlx::Error> {
        self.check()?;
        {
            let bookings = self.bookings.lock().unwrap();
            if bookings
                .iter()
                .any(|b| b.payment_intent_id == booking.payment_intent_id)
            {
                return Ok(BookingRecord::AlreadyRecorded);
            }
            if bookings.iter().any(|b| {
                b.appointment_date == booking.appointment_date
                    && b.appointment_time == booking.appointment_time.time()
            }) {
                return Ok(BookingRecord::SlotTaken);
            }
        }

        let user = self.insert_user(booking.user);
        let row = Booking {
            id: Uuid::new_v4(),
            user_id: user.id,
            payment_intent_id: booking.payment_intent_id,
            appointment_date: booking.appointment_date,
            appointment_time: booking.appointment_time.time(),
            amount_cents: booking.amount_cents,
            currency: booking.currency,
            created_at: Utc::now(),
        };
        self.bookings.lock().unwrap().push(row.clone());
        Ok(BookingRecord::Created(row))
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.check()
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Confirm(PaymentConfirmation),
    FailCreate,
}

/// Payment processor fake that records every call.
#[derive(Debug)]
pub struct RecordingProcessor {
    behavior: Behavior,
    /// When set, every confirmation waits for a permit
    gate: Option<Arc<Semaphore>>,
    created: Mutex<Vec<PaymentIntentRequest>>,
    confirmed: Mutex<Vec<(String, ConfirmPaymentParams)>>,
}

impl RecordingProcessor {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            gate: None,
            created: Mutex::default(),
            confirmed: Mutex::default(),
        }
    }

    pub fn succeeding() -> Self {
        Self::with(Behavior::Confirm(PaymentConfirmation::Succeeded))
    }

    pub fn confirming(confirmation: PaymentConfirmation) -> Self {
        Self::with(Behavior::Confirm(confirmation))
    }

    /// Confirmations succeed, but only once `gate` hands out a permit.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::succeeding()
        }
    }

    /// Intent creation fails as if the processor were down.
    pub fn unreachable() -> Self {
        Self::with(Behavior::FailCreate)
    }

    pub fn created(&self) -> Vec<PaymentIntentRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn confirmed(&self) -> Vec<(String, ConfirmPaymentParams)> {
        self.confirmed.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.created().len() + self.confirmed().len()
    }
}

#[async_trait]
impl PaymentProcessor for RecordingProcessor {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let n = {
            let mut created = self.created.lock().unwrap();
            created.push(request.clone());
            created.len()
        };
        if let Behavior::FailCreate = self.behavior {
            return Err(PaymentError::Api {
                status_code: 503,
                message: "processor unavailable".to_string(),
            });
        }

        Ok(PaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: format!("pi_test_{n}_secret_abc"),
            status: "requires_payment_method".to_string(),
        })
    }

    async fn confirm_payment(
        &self,
        client_secret: &str,
        params: &ConfirmPaymentParams,
    ) -> Result<PaymentConfirmation, PaymentError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        self.confirmed
            .lock()
            .unwrap()
            .push((client_secret.to_string(), params.clone()));
        match &self.behavior {
            Behavior::Confirm(confirmation) => Ok(confirmation.clone()),
            Behavior::FailCreate => Err(PaymentError::InvalidClientSecret),
        }
    }
}
