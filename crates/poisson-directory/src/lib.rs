//! Directory access for poisson.
//!
//! Provides the [`Directory`] trait, the only way the rest of the service
//! talks to the identity store, plus two implementations:
//!
//! - [`LdapDirectory`]: a real LDAP server, one connection per call.
//! - [`MemoryDirectory`]: an in-process directory for tests and local runs.
//!
//! # Feature Flags
//!
//! - `ldap` (default): LDAP implementation via `ldap3`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "ldap")]
mod ldap;
mod memory;

pub use error::DirectoryError;
#[cfg(feature = "ldap")]
pub use ldap::LdapDirectory;
pub use memory::MemoryDirectory;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use poisson_protocol::{UserId, UserProfile};
use secrecy::{ExposeSecret, Secret};

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A uid and its password, as presented to the directory in a bind.
///
/// `Debug` never shows the password.
pub struct Credentials {
    uid: UserId,
    password: Secret<String>,
}

impl Credentials {
    pub fn new(uid: UserId, password: Secret<String>) -> Self {
        Self { uid, password }
    }

    pub fn uid(&self) -> &UserId {
        &self.uid
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DirectoryConfig
// ---------------------------------------------------------------------------

/// Where the directory lives and how long we wait for it.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// `ldap://host:port` or `ldaps://host:port`.
    pub url: String,

    /// Base DN under which every user entry lives, e.g.
    /// `ou=People,dc=example,dc=org`.
    pub base_dn: String,

    /// Upper bound for a whole operation: connect, bind, the actual
    /// request and unbind. A slow directory fails the request instead of
    /// stalling it.
    pub timeout: Duration,
}

impl DirectoryConfig {
    pub fn new(url: impl Into<String>, base_dn: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_dn: base_dn.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// The identity store behind the service.
///
/// Every method is one self-contained exchange: implementations must not
/// keep connections or bound identities around between calls. Nothing is
/// retried; a failure is reported to the caller as-is.
///
/// Methods return `impl Future + Send` so the HTTP handlers that await
/// them can run on any worker thread. Implementations may still write
/// them as plain `async fn`.
pub trait Directory: Send + Sync + 'static {
    /// Opens (and closes) a connection, to report whether the directory
    /// is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Binds as `credentials`.
    ///
    /// # Errors
    /// - [`DirectoryError::InvalidCredentials`] if the bind is rejected
    /// - [`DirectoryError::Unavailable`] / [`DirectoryError::Timeout`]
    ///   if the directory can't be reached
    fn bind(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Looks up exactly one user.
    ///
    /// # Errors
    /// [`DirectoryError::NotFound`] for no match,
    /// [`DirectoryError::Ambiguous`] for several.
    fn find_user(
        &self,
        uid: &UserId,
    ) -> impl Future<Output = Result<UserProfile, DirectoryError>> + Send;

    /// Lists every user under the base DN.
    fn list_users(
        &self,
    ) -> impl Future<Output = Result<Vec<UserProfile>, DirectoryError>> + Send;

    /// Binds as `credentials`, then replaces `attribute` on that same
    /// user's entry with `value`.
    fn modify(
        &self,
        credentials: &Credentials,
        attribute: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Binds as `credentials`, then sets that user's password.
    fn change_password(
        &self,
        credentials: &Credentials,
        new_password: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}
