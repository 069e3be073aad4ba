//! Session types: the data structures behind a bearer token.
//!
//! A "session" is the server's record of a logged-in user. It tracks:
//! - WHO the user is (`UserId`)
//! - HOW to prove it to the directory again (the password they logged in
//!   with)
//! - WHAT token the client presents (`SessionToken`)
//! - WHEN it was created (for diagnostics and optional expiry)
//!
//! Sessions are immutable: once created, only their existence changes.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use poisson_protocol::UserId;
use secrecy::Secret;

use crate::token;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// How long a session lives after login, regardless of use.
    ///
    /// `None` (the default) keeps sessions until logout or restart.
    pub max_age: Option<Duration>,
}

// ---------------------------------------------------------------------------
// SessionToken
// ---------------------------------------------------------------------------

/// The opaque bearer credential handed to a client at login.
///
/// Tokens come from [`SessionToken::generate`] only; the `From` impls
/// exist so the HTTP layer can wrap what a client sends back for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// A fresh random token. See [`token::generate`] for the format.
    pub fn generate() -> Self {
        Self(token::generate())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SessionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single logged-in user.
///
/// The password is kept so privileged calls can bind to the directory as
/// this user again. It stays wrapped in [`Secret`]: `Debug` redacts it and
/// reading it takes an explicit `expose_secret()`.
#[derive(Debug)]
pub struct Session {
    user: UserId,
    password: Secret<String>,
    token: SessionToken,
    created_on: DateTime<Utc>,
    created_at: Instant,
}

impl Session {
    pub(crate) fn new(
        user: UserId,
        password: Secret<String>,
        token: SessionToken,
    ) -> Self {
        Self {
            user,
            password,
            token,
            created_on: Utc::now(),
            created_at: Instant::now(),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn password(&self) -> &Secret<String> {
        &self.password
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Wall-clock creation time.
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    /// Time since creation, on the monotonic clock.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Hex SHA-256 of the password, for diagnostics.
    pub fn password_digest(&self) -> String {
        token::digest(&self.password)
    }

    /// Whether the session has outlived `max_age`. A zero `max_age`
    /// expires everything immediately.
    pub(crate) fn is_expired(&self, max_age: Option<Duration>) -> bool {
        max_age.is_some_and(|max| self.age() >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            UserId::new("alice"),
            Secret::new("secret".to_string()),
            SessionToken::generate(),
        )
    }

    #[test]
    fn test_session_debug_redacts_password() {
        let debug = format!("{:?}", session());
        assert!(debug.contains("alice"));
        assert!(!debug.contains("\"secret\""));
    }

    #[test]
    fn test_session_token_wraps_client_string() {
        let token = SessionToken::from("abc");
        assert_eq!(token.as_str(), "abc");
        assert_eq!(SessionToken::generate().as_str().len(), 43);
    }

    #[test]
    fn test_session_never_expires_without_max_age() {
        assert!(!session().is_expired(None));
    }

    #[test]
    fn test_session_zero_max_age_expires_immediately() {
        assert!(session().is_expired(Some(Duration::ZERO)));
    }

    #[test]
    fn test_session_long_max_age_is_live() {
        assert!(!session().is_expired(Some(Duration::from_secs(3600))));
    }

    #[test]
    fn test_password_digest_is_not_the_password() {
        let digest = session().password_digest();
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, "secret");
    }
}
