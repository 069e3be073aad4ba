//! The session store: every live session, indexed two ways.
//!
//! Logins look sessions up by user (to hand back an existing token),
//! everything else looks them up by token. Both maps point at the same
//! `Arc<Session>`, and they are only ever touched together.
//!
//! # Concurrency note
//!
//! Both maps live in one [`SessionIndex`] behind a single
//! `tokio::sync::Mutex`. Every public method takes that lock exactly once
//! and does all its reads and writes inside it, so no task can observe a
//! token without its user entry or the other way round. The lock is never
//! held across directory I/O: callers bind first, then come here.

use std::collections::HashMap;
use std::sync::Arc;

use poisson_protocol::UserId;
use secrecy::Secret;
use tokio::sync::Mutex;

use crate::{Session, SessionConfig, SessionToken};

/// The two indices. Plain data, no locking: [`SessionStore`] owns the only
/// instance and guards it.
#[derive(Default)]
struct SessionIndex {
    by_user: HashMap<UserId, Arc<Session>>,
    by_token: HashMap<SessionToken, Arc<Session>>,
}

impl SessionIndex {
    fn insert(&mut self, session: Arc<Session>) {
        self.by_token
            .insert(session.token().clone(), Arc::clone(&session));
        self.by_user.insert(session.user().clone(), session);
    }

    /// Removes `session` from both maps. The user entry is only removed if
    /// it still belongs to this session, so a stale handle can't take a
    /// newer session's user entry down with it.
    fn remove(&mut self, session: &Session) -> bool {
        let removed = self.by_token.remove(session.token()).is_some();
        if self
            .by_user
            .get(session.user())
            .is_some_and(|current| current.token() == session.token())
        {
            self.by_user.remove(session.user());
        }
        removed
    }
}

/// Concurrency-safe store of live sessions.
///
/// ## Lifecycle
///
/// ```text
/// login ──→ create() ──→ lookup_by_token() … ──→ destroy() / destroy_by_token()
///              │                                        │
///              └── same user again: existing token      └── gone from both maps
/// ```
///
/// With [`SessionConfig::max_age`] set, a session older than that is
/// treated as absent by every lookup and removed on sight.
pub struct SessionStore {
    index: Mutex<SessionIndex>,
    config: SessionConfig,
}

impl SessionStore {
    /// Creates a new, empty store with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            index: Mutex::new(SessionIndex::default()),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the token of `user`'s session, creating the session first if
    /// there isn't a live one.
    ///
    /// A second login for the same user gets the same token back. Nothing
    /// is allocated or changed in that case.
    pub async fn create(
        &self,
        user: UserId,
        password: Secret<String>,
    ) -> SessionToken {
        let mut index = self.index.lock().await;

        if let Some(existing) = index.by_user.get(&user).cloned() {
            if !existing.is_expired(self.config.max_age) {
                tracing::info!(%user, "reusing existing session");
                return existing.token().clone();
            }
            index.remove(&existing);
            tracing::info!(%user, "replacing expired session");
        }

        // Tokens are unique among live sessions.
        let token = loop {
            let candidate = SessionToken::generate();
            if !index.by_token.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Arc::new(Session::new(user, password, token.clone()));
        tracing::info!(user = %session.user(), "session created");
        index.insert(session);

        token
    }

    /// Looks up a live session by token.
    pub async fn lookup_by_token(
        &self,
        token: &SessionToken,
    ) -> Option<Arc<Session>> {
        let mut index = self.index.lock().await;
        let session = index.by_token.get(token).cloned()?;
        self.live(&mut index, session)
    }

    /// Looks up a live session by user.
    pub async fn lookup_by_identity(
        &self,
        user: &UserId,
    ) -> Option<Arc<Session>> {
        let mut index = self.index.lock().await;
        let session = index.by_user.get(user).cloned()?;
        self.live(&mut index, session)
    }

    /// Removes `session` from the store. Idempotent: destroying a session
    /// that is already gone (or was never stored) does nothing.
    pub async fn destroy(&self, session: &Session) {
        let removed = self.index.lock().await.remove(session);
        if removed {
            tracing::info!(user = %session.user(), "session destroyed");
        }
    }

    /// Finds and removes the session for `token` in one step.
    ///
    /// Returns the removed session, or `None` if no live session had this
    /// token. Of several concurrent calls with the same token, exactly one
    /// gets `Some`.
    pub async fn destroy_by_token(
        &self,
        token: &SessionToken,
    ) -> Option<Arc<Session>> {
        let mut index = self.index.lock().await;
        let session = index.by_token.get(token).cloned()?;
        let session = self.live(&mut index, session)?;
        index.remove(&session);
        tracing::info!(user = %session.user(), "session destroyed");
        Some(session)
    }

    /// Removes every session older than `max_age` and returns their users.
    /// Does nothing when sessions don't expire.
    pub async fn purge_expired(&self) -> Vec<UserId> {
        let Some(max_age) = self.config.max_age else {
            return Vec::new();
        };

        let mut index = self.index.lock().await;
        let expired: Vec<Arc<Session>> = index
            .by_user
            .values()
            .filter(|s| s.is_expired(Some(max_age)))
            .cloned()
            .collect();

        for session in &expired {
            index.remove(session);
            tracing::info!(user = %session.user(), "session expired");
        }

        expired.iter().map(|s| s.user().clone()).collect()
    }

    /// Every live session, ordered by user.
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        let index = self.index.lock().await;
        let mut sessions: Vec<Arc<Session>> = index
            .by_user
            .values()
            .filter(|s| !s.is_expired(self.config.max_age))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.user().cmp(b.user()));
        sessions
    }

    /// Number of stored sessions, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.index.lock().await.by_user.len()
    }

    /// Returns `true` if there are no sessions.
    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.by_user.is_empty()
    }

    /// Passes a live session through, or removes an expired one.
    fn live(
        &self,
        index: &mut SessionIndex,
        session: Arc<Session>,
    ) -> Option<Arc<Session>> {
        if session.is_expired(self.config.max_age) {
            index.remove(&session);
            tracing::info!(user = %session.user(), "session expired");
            return None;
        }
        Some(session)
    }

    /// Checks that both maps agree. Tests only.
    #[cfg(test)]
    async fn assert_consistent(&self) {
        let index = self.index.lock().await;
        assert_eq!(index.by_user.len(), index.by_token.len());
        for (user, session) in &index.by_user {
            assert_eq!(session.user(), user);
            let by_token = index
                .by_token
                .get(session.token())
                .expect("user entry without token entry");
            assert!(Arc::ptr_eq(session, by_token));
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
