//! Shared-secret gate in front of the generation operations.
//!
//! The pipeline never looks inside a session; callers only ask
//! [`Session::is_authenticated`].

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// How long a successful login stays valid, in days.
pub const SESSION_MAX_AGE_DAYS: i64 = 7;

pub struct AuthGate {
    password: String,
}

impl AuthGate {
    /// There is no built-in fallback password; an empty one is a configuration error.
    pub fn new(password: String) -> Result<Self> {
        if password.trim().is_empty() {
            return Err(Error::Config("APP_PASSWORD must not be empty".to_string()));
        }
        Ok(Self { password })
    }

    /// Checks `candidate` and marks the session authenticated on a match.
    pub fn verify(&self, candidate: &str, session: &mut Session) -> bool {
        if candidate == self.password {
            session.authenticate(Utc::now());
            true
        } else {
            tracing::warn!("Rejected login attempt with incorrect password");
            false
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn authenticate(&mut self, at: DateTime<Utc>) {
        self.authenticated_at = Some(at);
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        self.authenticated_at.is_some_and(|at| {
            now.signed_duration_since(at) < Duration::days(SESSION_MAX_AGE_DAYS)
        })
    }

    pub fn clear(&mut self) {
        self.authenticated_at = None;
    }
}
