//! Booking page HTTP handlers.
//!
//! - GET / - Render the form (a fresh page per navigation)
//! - POST / - Submit a booking and pay

use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;

use crate::{
    app::AppState,
    booking::{
        self, BookingForm, BookingPage, SubmitOutcome, render::render_page,
        session::SESSION_COOKIE,
    },
};

/// Query parameters the payment processor appends when sending the browser back.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub payment_status: Option<String>,
}

fn session_id(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn remember_session(cookies: &Cookies, id: Uuid) {
    let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);
}

fn render(state: &AppState, id: Uuid) -> Html<String> {
    let (page, alert): (BookingPage, Option<String>) = state.sessions.with_page(id, |page| {
        let alert = page.take_alert();
        (page.clone(), alert)
    });
    Html(render_page(
        &page,
        alert.as_deref(),
        &state.booking.publishable_key,
    ))
}

/// Render the booking form.
///
/// Every navigation resets the session's page, so a reload restores the full
/// slot list. `?payment_status=success` marks the page as paid.
pub async fn show_booking_page(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let id = state.sessions.mount(session_id(&cookies));
    remember_session(&cookies, id);

    state.sessions.with_page(id, |page| {
        page.apply_return_status(query.payment_status.as_deref());
    });

    render(&state, id)
}

/// Handle a booking submission.
///
/// Responds with the re-rendered page, or with a redirect when the payment
/// processor needs the browser for an extra confirmation step.
pub async fn submit_booking(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<BookingForm>,
) -> Response {
    let id = match session_id(&cookies) {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4();
            remember_session(&cookies, id);
            id
        }
    };

    let today = Utc::now().date_naive();
    let pending = state
        .sessions
        .with_page(id, |page| page.begin_submit(&form, today));

    if let Some(pending) = pending {
        // Detached: a client disconnect must not leave the session loading
        let task_state = state.clone();
        let task = tokio::spawn(async move {
            let result =
                booking::pay(task_state.payments.as_ref(), &task_state.booking, &pending).await;
            task_state
                .sessions
                .with_page(id, |page| page.finish_submit(&pending, result))
        });

        match task.await {
            Ok(SubmitOutcome::Redirect(url)) => {
                tracing::info!("Redirecting booking session {} for payment confirmation", id);
                return Redirect::to(&url).into_response();
            }
            Ok(SubmitOutcome::Render) => {}
            Err(e) => {
                tracing::error!("Booking submission for session {} aborted: {}", id, e);
                state.sessions.with_page(id, BookingPage::abort_submit);
            }
        }
    }

    render(&state, id).into_response()
}
