//! Persistence for users and bookings.
//!
//! Handlers talk to a `BookingStore` rather than the pool directly so the
//! HTTP layer can be exercised without a running PostgreSQL.

use async_trait::async_trait;

use crate::{
    db::DbPool,
    models::{
        booking::{Booking, BookingRecord, NewBooking},
        user::{NewUser, User},
    },
};

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// All user rows.
    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error>;

    /// Insert one user and return the stored row.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;

    /// Record a paid booking together with its user, atomically.
    async fn record_booking(&self, booking: NewBooking) -> Result<BookingRecord, sqlx::Error>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: DbPool,
}

impl PgBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn intent_recorded(&self, payment_intent_id: &str) -> Result<bool, sqlx::Error> {
        let existing: Option<uuid::Uuid> =
            sqlx::query_scalar("SELECT id FROM bookings WHERE payment_intent_id = $1")
                .bind(payment_intent_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(existing.is_some())
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        // The connection goes back to the pool when `conn` drops, on the error path too
        let mut conn = self.pool.acquire().await?;

        sqlx::query_as::<_, User>("SELECT id, name, email FROM users ORDER BY id")
            .fetch_all(&mut *conn)
            .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email)
            VALUES ($1, $2)
            RETURNING id, name, email
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .fetch_one(&mut *conn)
        .await
    }

    async fn record_booking(&self, booking: NewBooking) -> Result<BookingRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let already: Option<uuid::Uuid> =
            sqlx::query_scalar("SELECT id FROM bookings WHERE payment_intent_id = $1")
                .bind(&booking.payment_intent_id)
                .fetch_optional(&mut *tx)
                .await?;
        if already.is_some() {
            tx.rollback().await?;
            return Ok(BookingRecord::AlreadyRecorded);
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id, name, email",
        )
        .bind(&booking.user.name)
        .bind(&booking.user.email)
        .fetch_one(&mut *tx)
        .await?;

        // Either unique constraint may fire; both mean "do not write"
        let created = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                user_id,
                payment_intent_id,
                appointment_date,
                appointment_time,
                amount_cents,
                currency
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            RETURNING id, user_id, payment_intent_id, appointment_date, appointment_time,
                      amount_cents, currency, created_at
            "#,
        )
        .bind(user.id)
        .bind(&booking.payment_intent_id)
        .bind(booking.appointment_date)
        .bind(booking.appointment_time.time())
        .bind(booking.amount_cents)
        .bind(&booking.currency)
        .fetch_optional(&mut *tx)
        .await?;

        match created {
            Some(row) => {
                tx.commit().await?;
                Ok(BookingRecord::Created(row))
            }
            None => {
                // Drops the user row inserted above
                tx.rollback().await?;
                if self.intent_recorded(&booking.payment_intent_id).await? {
                    Ok(BookingRecord::AlreadyRecorded)
                } else {
                    Ok(BookingRecord::SlotTaken)
                }
            }
        }
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
