//! Admin session registry

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::clock::Clock;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "countdown_session";

/// Tokens of logged-in admins and when they expire
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            lifetime,
            clock,
        }
    }

    /// Open a new session and return its token
    pub fn create(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = self.clock.now() + self.lifetime;
        self.with_sessions(|sessions| {
            sessions.insert(token.clone(), expires_at);
        });
        info!("Admin session opened");
        token
    }

    /// Whether the token names a live session
    pub fn is_valid(&self, token: &str) -> bool {
        let now = self.clock.now();
        self.with_sessions(|sessions| match sessions.get(token) {
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        })
    }

    pub fn revoke(&self, token: &str) {
        if self.with_sessions(|sessions| sessions.remove(token)).is_some() {
            info!("Admin session closed");
        }
    }

    /// Drop expired sessions, returning how many were removed
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self.with_sessions(|sessions| {
            let before = sessions.len();
            sessions.retain(|_, expires_at| *expires_at > now);
            before - sessions.len()
        });
        if removed > 0 {
            debug!("Pruned {} expired sessions", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.with_sessions(|sessions| sessions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    // A poisoned map only ever holds plain tokens, so keep using it
    fn with_sessions<T>(&self, f: impl FnOnce(&mut HashMap<String, DateTime<Utc>>) -> T) -> T {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut sessions)
    }
}

/// Pull the session token out of a `Cookie` header value
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that installs a session token
pub fn session_cookie(token: &str, lifetime: Duration) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        lifetime.num_seconds()
    )
}

/// `Set-Cookie` value that clears the session token
pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
