//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;
use url::Url;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `POSTGRES_USER`, `POSTGRES_HOST`, `POSTGRES_DB`, `POSTGRES_PASSWORD`, `POSTGRES_PORT` (required):
///   PostgreSQL connection parameters
/// - `NEXT_PUBLIC_STRIPE_PUBLISHABLE_KEY` (required): key embedded in the booking page for Stripe.js
/// - `STRIPE_SECRET_KEY` (required): server-side key used to create and confirm payment intents
/// - `STRIPE_WEBHOOK_SECRET` (optional): signing secret for `/api/webhooks/stripe`
/// - `STRIPE_API_BASE` (optional): defaults to `https://api.stripe.com`
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `PUBLIC_BASE_URL` (optional): origin the browser sees, defaults to `http://localhost:3000`
/// - `BOOKING_AMOUNT_CENTS` (optional): price of one session in minor units, defaults to 5000
/// - `BOOKING_CURRENCY` (optional): ISO currency code, defaults to `usd`
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub postgres_user: String,
    pub postgres_host: String,
    pub postgres_db: String,
    pub postgres_password: String,
    pub postgres_port: u16,

    #[serde(rename = "next_public_stripe_publishable_key")]
    pub stripe_publishable_key: String,
    pub stripe_secret_key: String,
    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_booking_amount")]
    pub booking_amount_cents: i64,
    #[serde(default = "default_currency")]
    pub booking_currency: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// $50.00
fn default_booking_amount() -> i64 {
    5000
}

fn default_currency() -> String {
    "usd".to_string()
}

/// The five values the database connector needs.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub user: String,
    pub host: String,
    pub database: String,
    pub password: String,
    pub port: u16,
}

/// Settings the booking page and payment endpoints read at request time.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub publishable_key: String,
    pub amount_cents: i64,
    pub currency: String,
    /// Where the payment processor sends the browser after an off-page confirmation.
    pub return_url: String,
    pub webhook_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., POSTGRES_HOST)
    /// - Environment variable values cannot be parsed into expected types (e.g., POSTGRES_PORT)
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: postgres_host -> POSTGRES_HOST
        envy::from_env::<Config>()
    }

    pub fn database(&self) -> DatabaseSettings {
        DatabaseSettings {
            user: self.postgres_user.clone(),
            host: self.postgres_host.clone(),
            database: self.postgres_db.clone(),
            password: self.postgres_password.clone(),
            port: self.postgres_port,
        }
    }

    /// Derive the booking settings, validating the public base URL.
    pub fn booking(&self) -> Result<BookingSettings, url::ParseError> {
        Ok(BookingSettings {
            publishable_key: self.stripe_publishable_key.clone(),
            amount_cents: self.booking_amount_cents,
            currency: self.booking_currency.to_lowercase(),
            return_url: payment_return_url(&self.public_base_url)?,
            webhook_secret: self
                .stripe_webhook_secret
                .clone()
                .filter(|secret| !secret.is_empty()),
        })
    }
}

/// Build `<base>/?payment_status=success`.
pub fn payment_return_url(public_base_url: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(public_base_url)?.join("/")?;
    url.query_pairs_mut()
        .append_pair("payment_status", "success");
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_url_points_at_the_booking_page() {
        assert_eq!(
            payment_return_url("http://localhost:3000").unwrap(),
            "http://localhost:3000/?payment_status=success"
        );
        assert_eq!(
            payment_return_url("https://book.example.com/some/path").unwrap(),
            "https://book.example.com/?payment_status=success"
        );
    }

    #[test]
    fn return_url_rejects_garbage() {
        assert!(payment_return_url("not a url").is_err());
    }

    #[test]
    fn environment_is_deserialized_with_defaults() {
        let vars = vec![
            ("POSTGRES_USER".to_string(), "booking".to_string()),
            ("POSTGRES_HOST".to_string(), "localhost".to_string()),
            ("POSTGRES_DB".to_string(), "acupuncture".to_string()),
            ("POSTGRES_PASSWORD".to_string(), "secret".to_string()),
            ("POSTGRES_PORT".to_string(), "5432".to_string()),
            (
                "NEXT_PUBLIC_STRIPE_PUBLISHABLE_KEY".to_string(),
                "pk_test_123".to_string(),
            ),
            ("STRIPE_SECRET_KEY".to_string(), "sk_test_123".to_string()),
            ("BOOKING_CURRENCY".to_string(), "USD".to_string()),
        ];

        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.postgres_port, 5432);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.stripe_api_base, "https://api.stripe.com");
        assert_eq!(config.stripe_publishable_key, "pk_test_123");

        let booking = config.booking().unwrap();
        assert_eq!(booking.amount_cents, 5000);
        assert_eq!(booking.currency, "usd");
        assert!(booking.webhook_secret.is_none());
    }

    #[test]
    fn unparseable_port_is_rejected() {
        let vars = vec![
            ("POSTGRES_USER".to_string(), "booking".to_string()),
            ("POSTGRES_HOST".to_string(), "localhost".to_string()),
            ("POSTGRES_DB".to_string(), "acupuncture".to_string()),
            ("POSTGRES_PASSWORD".to_string(), "secret".to_string()),
            ("POSTGRES_PORT".to_string(), "not-a-port".to_string()),
            (
                "NEXT_PUBLIC_STRIPE_PUBLISHABLE_KEY".to_string(),
                "pk_test_123".to_string(),
            ),
            ("STRIPE_SECRET_KEY".to_string(), "sk_test_123".to_string()),
        ];

        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }
}
