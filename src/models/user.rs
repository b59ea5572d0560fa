//! User data models and API request types.
//!
//! This module defines:
//! - `User`: Database entity returned by `/api/users`
//! - `CreateUserRequest`: Request body for creating users
//! - `NewUser`: A validated insert

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Rows are only ever inserted and listed.
///
/// # JSON Example
///
/// ```json
/// { "id": 1, "name": "Jane Doe", "email": "jane@example.com" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    /// Generated by the `SERIAL` column
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Request body for `POST /api/users`.
///
/// Both fields are optional at the deserialization level so that a missing
/// field is reported as a 400 with a readable message instead of an
/// extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A user ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl TryFrom<CreateUserRequest> for NewUser {
    type Error = AppError;

    fn try_from(request: CreateUserRequest) -> Result<Self, Self::Error> {
        let name = required("name", request.name)?;
        let email = required("email", request.email)?;
        Ok(Self { name, email })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::InvalidRequest(format!("{field} is required"))),
    }
}
