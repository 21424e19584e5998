//! Passcode sessions.
//!
//! A successful passcode check opens a session identified by a random v4 UUID. Each session
//! carries its own expiry and the outcome of its most recent sync, so downloads are served from
//! the sync the same user ran. Expiry slides forward on every authenticated use; an expired
//! session is removed the moment it is seen.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use sync_core::SyncOutcome;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no such session")]
    Unknown,
    #[error("session expired")]
    Expired,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_sync: Option<Arc<SyncOutcome>>,
}

/// Parses a session id header value.
pub fn parse_session_id(value: &str) -> Result<Uuid, SessionError> {
    Uuid::parse_str(value.trim()).map_err(|_| SessionError::Unknown)
}

/// In-memory session table, cheap to clone and share between handlers.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(1)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn open(&self) -> Session {
        self.open_at(Utc::now())
    }

    /// Opens a new session starting at `now`.
    pub fn open_at(&self, now: DateTime<Utc>) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + self.ttl,
            last_sync: None,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.id, session.clone());
        tracing::info!(open_sessions = sessions.len(), "session opened");
        session
    }

    pub fn touch(&self, id: Uuid) -> Result<Session, SessionError> {
        self.touch_at(id, Utc::now())
    }

    /// Validates a session and slides its expiry forward.
    pub fn touch_at(&self, id: Uuid, now: DateTime<Utc>) -> Result<Session, SessionError> {
        self.update_at(id, now, |_| {})
    }

    pub fn record_sync(
        &self,
        id: Uuid,
        outcome: Arc<SyncOutcome>,
    ) -> Result<Session, SessionError> {
        self.record_sync_at(id, outcome, Utc::now())
    }

    /// Stores a sync outcome on a live session, replacing any earlier one.
    pub fn record_sync_at(
        &self,
        id: Uuid,
        outcome: Arc<SyncOutcome>,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        self.update_at(id, now, move |session| session.last_sync = Some(outcome))
    }

    /// Ends a session. Returns whether it existed.
    pub fn close(&self, id: Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            tracing::info!("session closed");
        }
        removed
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    /// Drops every session whose expiry is at or before `now`. Returns how many were dropped.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired sessions");
        }
        purged
    }

    fn update_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Session),
    ) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(&id).ok_or(SessionError::Unknown)?;

        if session.expires_at <= now {
            sessions.remove(&id);
            tracing::info!("session expired");
            return Err(SessionError::Expired);
        }

        session.expires_at = now + self.ttl;
        apply(session);
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 9, 0, 0).unwrap()
    }

    fn store() -> SessionStore {
        SessionStore::new(std::time::Duration::from_secs(20 * 60))
    }

    fn outcome() -> Arc<SyncOutcome> {
        Arc::new(SyncOutcome {
            synced_at: t0(),
            cohorts: Vec::new(),
        })
    }

    #[test]
    fn open_issues_distinct_ids_with_ttl() {
        let store = store();
        let a = store.open_at(t0());
        let b = store.open_at(t0());

        assert_ne!(a.id, b.id);
        assert_eq!(a.expires_at, t0() + Duration::minutes(20));
        assert!(a.last_sync.is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn touch_slides_expiry() {
        let store = store();
        let session = store.open_at(t0());

        let later = t0() + Duration::minutes(15);
        let touched = store.touch_at(session.id, later).expect("live");
        assert_eq!(touched.expires_at, later + Duration::minutes(20));

        // Still alive past the original expiry because it was refreshed.
        store
            .touch_at(session.id, t0() + Duration::minutes(30))
            .expect("refreshed");
    }

    #[test]
    fn expired_sessions_are_rejected_and_removed() {
        let store = store();
        let session = store.open_at(t0());

        let err = store
            .touch_at(session.id, t0() + Duration::minutes(20))
            .expect_err("expired");
        assert_eq!(err, SessionError::Expired);
        assert!(store.is_empty());
        assert_eq!(
            store.touch_at(session.id, t0()).expect_err("gone"),
            SessionError::Unknown
        );
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let store = store();
        assert_eq!(
            store.touch_at(Uuid::new_v4(), t0()).expect_err("unknown"),
            SessionError::Unknown
        );
        assert_eq!(parse_session_id("not-a-uuid"), Err(SessionError::Unknown));
    }

    #[test]
    fn record_sync_is_per_session() {
        let store = store();
        let a = store.open_at(t0());
        let b = store.open_at(t0());

        store
            .record_sync_at(a.id, outcome(), t0() + Duration::minutes(1))
            .expect("record");

        let a = store.touch_at(a.id, t0() + Duration::minutes(2)).expect("a");
        let b = store.touch_at(b.id, t0() + Duration::minutes(2)).expect("b");
        assert!(a.last_sync.is_some());
        assert!(b.last_sync.is_none());
    }

    #[test]
    fn close_removes_session() {
        let store = store();
        let session = store.open_at(t0());
        assert!(store.close(session.id));
        assert!(!store.close(session.id));
        assert_eq!(
            store.touch_at(session.id, t0()).expect_err("closed"),
            SessionError::Unknown
        );
    }

    #[test]
    fn purge_drops_only_expired() {
        let store = store();
        store.open_at(t0());
        let fresh = store.open_at(t0() + Duration::minutes(10));

        assert_eq!(store.purge_expired_at(t0() + Duration::minutes(25)), 1);
        assert_eq!(store.len(), 1);
        store
            .touch_at(fresh.id, t0() + Duration::minutes(25))
            .expect("fresh survives");
    }

    #[test]
    fn parses_header_values() {
        let id = Uuid::new_v4();
        assert_eq!(parse_session_id(&format!(" {id} ")), Ok(id));
    }
}
