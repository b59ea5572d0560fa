//! Per-browser booking page state, kept in memory.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use uuid::Uuid;

use super::BookingPage;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "booking_session";

/// Sessions untouched for this long are dropped.
pub const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct Session {
    page: BookingPage,
    touched: Instant,
}

/// Shared map of session id to booking page.
///
/// The lock is only held for synchronous page updates, never across an await.
/// Idle sessions are purged whenever a session is created.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
    idle_limit: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: Arc::default(),
            idle_limit: SESSION_IDLE_LIMIT,
        }
    }
}

impl SessionStore {
    #[cfg(test)]
    fn with_idle_limit(idle_limit: Duration) -> Self {
        Self {
            idle_limit,
            ..Self::default()
        }
    }

    /// Load the page for a navigation: reset the existing session or start a new one.
    pub fn mount(&self, id: Option<Uuid>) -> Uuid {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        purge_idle(&mut sessions, now, self.idle_limit);
        sessions.insert(
            id,
            Session {
                page: BookingPage::mount(),
                touched: now,
            },
        );

        id
    }

    /// Run `f` against the session's page, creating a fresh page if the session is unknown.
    pub fn with_page<R>(&self, id: Uuid, f: impl FnOnce(&mut BookingPage) -> R) -> R {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        if !sessions.contains_key(&id) {
            purge_idle(&mut sessions, now, self.idle_limit);
        }
        let session = sessions.entry(id).or_insert_with(|| Session {
            page: BookingPage::mount(),
            touched: now,
        });
        session.touched = now;
        f(&mut session.page)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn purge_idle(sessions: &mut HashMap<Uuid, Session>, now: Instant, idle_limit: Duration) {
    sessions.retain(|_, session| now.duration_since(session.touched) < idle_limit);
}
