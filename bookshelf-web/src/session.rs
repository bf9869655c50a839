//! In-process session store for flash state
//!
//! Holds the one-read form state between a failed (or successful) POST and
//! the next rendered page: flash message, old input, and per-field errors.
//! Sessions are keyed by a UUID carried in a cookie; reading a session
//! removes it, giving flash its display-once semantics.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "bookshelf_session";

/// Flash message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Error,
}

/// A one-time notice displayed on the next rendered page
#[derive(Debug, Clone)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Per-session form state, cleared when read
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub flash: Option<Flash>,
    /// Old single-valued form input, for repopulating fields after an error
    pub old_input: HashMap<String, String>,
    /// Old multi-valued form input (checkbox groups)
    pub old_multi: HashMap<String, Vec<String>>,
    /// First validation error per field
    pub field_errors: HashMap<String, String>,
}

impl SessionData {
    pub fn with_flash(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            flash: Some(Flash { level, message: message.into() }),
            ..Default::default()
        }
    }
}

/// Shared session map
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionData>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store session data, replacing anything already held for the id
    pub async fn put(&self, id: Uuid, data: SessionData) {
        self.inner.write().await.insert(id, data);
    }

    /// Take (and clear) session data; default when none is held
    pub async fn take(&self, id: Uuid) -> SessionData {
        self.inner.write().await.remove(&id).unwrap_or_default()
    }
}

/// Extract the session id from the request's Cookie header
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        // Flag-style pairs without '=' are legal; skip them
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if name == SESSION_COOKIE {
            return Uuid::parse_str(value).ok();
        }
    }
    None
}

/// Session id from the request, minting a fresh one when absent
pub fn session_id_or_new(headers: &HeaderMap) -> Uuid {
    session_id(headers).unwrap_or_else(Uuid::new_v4)
}

/// Response headers carrying the session cookie
pub fn session_headers(id: Uuid) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    if let Ok(value) = cookie.parse() {
        headers.insert(SET_COOKIE, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn take_clears_session_data() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();

        store
            .put(id, SessionData::with_flash(FlashLevel::Error, "nope"))
            .await;

        let first = store.take(id).await;
        assert_eq!(first.flash.unwrap().message, "nope");

        let second = store.take(id).await;
        assert!(second.flash.is_none(), "flash must be one-read");
    }

    #[test]
    fn session_id_round_trips_through_cookie_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("other=1; {}={}", SESSION_COOKIE, id).parse().unwrap(),
        );

        assert_eq!(session_id(&headers), Some(id));
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn flag_style_pair_does_not_hide_later_session_cookie() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("secure_flag; {}={}", SESSION_COOKIE, id).parse().unwrap(),
        );

        assert_eq!(session_id(&headers), Some(id));
    }
}
