//! Admin passcode gate and sessions.
//!
//! The passcode is a shared secret kept in the `settings/site` document. A
//! successful login trades it for a random session token that expires after
//! a configurable TTL.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{SiteSettings, SETTINGS_ID};
use crate::storage::Storage;

/// Whether `candidate` is exactly the stored passcode.
///
/// An empty stored passcode matches nothing. Digests are compared so the
/// comparison time does not depend on how much of the candidate is right.
#[must_use]
pub fn check_passcode(stored: &str, candidate: &str) -> bool {
    if stored.is_empty() {
        return false;
    }
    blake3::hash(stored.as_bytes()) == blake3::hash(candidate.as_bytes())
}

/// A session handed out on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// In-memory admin sessions.
#[derive(Debug)]
pub struct SessionStore {
    ttl: TimeDelta,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    /// Create a store whose sessions last `ttl`.
    #[must_use]
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>>> {
        self.sessions
            .lock()
            .map_err(|_| Error::internal("session store lock poisoned"))
    }

    /// Issue a new session starting now.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn issue(&self) -> Result<Session> {
        self.issue_at(Utc::now())
    }

    /// Issue a new session starting at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<Session> {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = now + self.ttl;

        let mut sessions = self.lock()?;
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token.clone(), expires_at);

        Ok(Session { token, expires_at })
    }

    /// Whether `token` names a live session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn validate(&self, token: &str) -> Result<bool> {
        self.validate_at(token, Utc::now())
    }

    /// Whether `token` names a session live at `now`. Expired sessions are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut sessions = self.lock()?;
        match sessions.get(token).copied() {
            Some(expiry) if expiry > now => Ok(true),
            Some(_) => {
                debug!("Session expired");
                sessions.remove(token);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// End a session. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn revoke(&self, token: &str) -> Result<bool> {
        Ok(self.lock()?.remove(token).is_some())
    }

    /// Number of sessions held, including expired ones not yet purged.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

/// Check `candidate` against the stored passcode and open a session.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] if no passcode is set or it does not
/// match, or a storage error if the settings cannot be read.
pub fn login(storage: &Storage, sessions: &SessionStore, candidate: &str) -> Result<Session> {
    let settings: Option<SiteSettings> = storage.load(SETTINGS_ID)?;
    let Some(settings) = settings else {
        warn!("Admin login attempted but no settings document exists");
        return Err(Error::Unauthorized);
    };

    if !check_passcode(&settings.admin_passcode, candidate) {
        warn!("Admin login rejected");
        return Err(Error::Unauthorized);
    }

    let session = sessions.issue()?;
    info!("Admin session opened, expires {}", session.expires_at);
    Ok(session)
}
