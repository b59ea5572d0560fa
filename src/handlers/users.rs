//! Users resource HTTP handlers.
//!
//! - GET /api/users - List all users
//! - POST /api/users - Create a user
//! - any other method - 405 Method Not Allowed

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode, header},
    response::IntoResponse,
};

use crate::{
    app::AppState,
    error::AppError,
    models::user::{CreateUserRequest, NewUser, User},
};

/// List all users.
///
/// # Response
///
/// - **Success (200 OK)**: array of users (may be empty)
/// - **Error (500)**: `{"error": "Internal Server Error"}`
///
/// ```json
/// [ { "id": 1, "name": "Jane Doe", "email": "jane@example.com" } ]
/// ```
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

/// Create a user.
///
/// # Request Body
///
/// ```json
/// { "name": "Jane Doe", "email": "jane@example.com" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the inserted row
/// - **Error (400)**: missing `name`/`email` or malformed JSON
/// - **Error (500)**: database error
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(request) = payload?;
    let new_user = NewUser::try_from(request)?;

    let user = state.store.create_user(new_user).await?;
    tracing::info!("Created user {}", user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Reject any method other than GET and POST.
pub async fn method_not_allowed(method: Method) -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, POST")],
        format!("Method {method} Not Allowed"),
    )
}
