//! The auth core: every operation the HTTP layer exposes, minus HTTP.
//!
//! `AuthCore` owns the session store and the directory handle. Operations
//! that change something in the directory never trust the session alone:
//! they bind again with the stored password first, so a password changed
//! behind our back locks the old session out of privileged calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use poisson_directory::{Credentials, Directory, DirectoryError};
use poisson_protocol::{UserId, UserProfile};
use poisson_session::{
    Session, SessionConfig, SessionError, SessionStore, SessionToken,
};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::AuthError;

/// One row of [`SessionsReport`]. The password is only ever shown as a
/// digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub username: UserId,
    pub password_digest: String,
    pub created_on: DateTime<Utc>,
}

/// What `GET /debug` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionsReport {
    pub count: usize,
    pub sessions: Vec<SessionInfo>,
}

/// Login, logout, and everything a session token unlocks.
pub struct AuthCore<D: Directory> {
    directory: D,
    sessions: SessionStore,
}

impl<D: Directory> AuthCore<D> {
    pub fn new(directory: D, config: SessionConfig) -> Self {
        Self {
            directory,
            sessions: SessionStore::new(config),
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Binds as `username` and returns a session token.
    ///
    /// A user who already has a live session gets that session's token.
    /// Sessions are keyed by the uid as the directory spells it, so
    /// `alice` and `ALICE` share one. An empty password is refused up
    /// front: LDAP would treat it as an anonymous bind and let it through.
    pub async fn login(
        &self,
        username: &str,
        password: Secret<String>,
    ) -> Result<SessionToken, AuthError> {
        let user = UserId::new(username);
        if user.is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let credentials =
            Credentials::new(user, Secret::new(password.expose_secret().clone()));
        self.directory.bind(&credentials).await?;

        let user = match self.directory.find_user(credentials.uid()).await {
            Ok(profile) => profile.username,
            Err(DirectoryError::NotFound(_)) => {
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(self.sessions.create(user, password).await)
    }

    /// Ends the session behind `token`.
    pub async fn logout(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.sessions
            .destroy_by_token(token)
            .await
            .ok_or(SessionError::UnknownToken)?;
        Ok(())
    }

    /// Resolves `token` and proves to the directory that its password
    /// still works.
    ///
    /// An unknown token fails without touching the directory. A rejected
    /// re-bind fails the call but leaves the session alone; the user
    /// still has to log out (or log in again) to replace it.
    pub async fn authorize(
        &self,
        token: &SessionToken,
    ) -> Result<(Arc<Session>, Credentials), AuthError> {
        let session = self
            .sessions
            .lookup_by_token(token)
            .await
            .ok_or(SessionError::UnknownToken)?;

        let credentials = Credentials::new(
            session.user().clone(),
            Secret::new(session.password().expose_secret().clone()),
        );

        self.directory.bind(&credentials).await?;
        Ok((session, credentials))
    }

    /// Replaces one attribute on the caller's own entry.
    pub async fn update_property(
        &self,
        token: &SessionToken,
        property: &str,
        value: &str,
    ) -> Result<(), AuthError> {
        if property.trim().is_empty() {
            return Err(AuthError::MalformedRequest(
                "property name is empty".into(),
            ));
        }

        let (session, credentials) = self.authorize(token).await?;
        self.directory.modify(&credentials, property, value).await?;

        tracing::info!(user = %session.user(), property, "attribute updated");
        Ok(())
    }

    /// Sets a new password for the caller.
    ///
    /// The session is destroyed afterwards, because the password it holds
    /// no longer binds. The caller logs in again with the new one.
    pub async fn change_password(
        &self,
        token: &SessionToken,
        new_password: Secret<String>,
    ) -> Result<(), AuthError> {
        if new_password.expose_secret().is_empty() {
            return Err(AuthError::MalformedRequest("password is empty".into()));
        }

        let (session, credentials) = self.authorize(token).await?;
        self.directory
            .change_password(&credentials, new_password.expose_secret())
            .await?;

        tracing::info!(user = %session.user(), "password changed");
        self.sessions.destroy(&session).await;
        Ok(())
    }

    /// One user's profile. Needs no session.
    pub async fn profile(&self, user: &UserId) -> Result<UserProfile, AuthError> {
        Ok(self.directory.find_user(user).await?)
    }

    /// Every user's profile. Needs no session.
    pub async fn profiles(&self) -> Result<Vec<UserProfile>, AuthError> {
        Ok(self.directory.list_users().await?)
    }

    /// Whether the directory can be reached right now.
    pub async fn status(&self) -> bool {
        match self.directory.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "directory status check failed");
                false
            }
        }
    }

    /// Lists live sessions, with password digests in place of passwords.
    pub async fn sessions_report(&self) -> SessionsReport {
        let sessions: Vec<SessionInfo> = self
            .sessions
            .snapshot()
            .await
            .iter()
            .map(|session| SessionInfo {
                username: session.user().clone(),
                password_digest: session.password_digest(),
                created_on: session.created_on(),
            })
            .collect();

        tracing::info!(count = sessions.len(), "session report");
        for info in &sessions {
            tracing::info!(
                user = %info.username,
                password_digest = %info.password_digest,
                created_on = %info.created_on,
                "live session"
            );
        }

        SessionsReport {
            count: sessions.len(),
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::response::IntoResponse;
    use poisson_directory::MemoryDirectory;
    use poisson_protocol::UserRole;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use super::*;

    fn profile(uid: &str, role: UserRole) -> UserProfile {
        UserProfile {
            username: UserId::new(uid),
            id: 1000,
            name: uid.to_string(),
            surname: "Test".into(),
            email: format!("{uid}@example.org"),
            description: role,
            full_name: format!("{uid} Test"),
        }
    }

    fn pw(password: &str) -> Secret<String> {
        Secret::new(password.to_string())
    }

    /// Counts events that carry an `error` field while installed as the
    /// thread's subscriber.
    #[derive(Clone, Default)]
    struct ErrorEvents(Arc<AtomicUsize>);

    impl ErrorEvents {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let subscriber = tracing_subscriber::registry().with(self.clone());
            tracing::subscriber::set_default(subscriber)
        }

        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for ErrorEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().fields().field("error").is_some() {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn core() -> AuthCore<MemoryDirectory> {
        let directory = MemoryDirectory::new()
            .with_user(profile("alice", UserRole::Doctoral), "secret")
            .with_user(profile("bob", UserRole::Student), "hunter2");
        AuthCore::new(directory, SessionConfig::default())
    }

    // =====================================================================
    // login()
    // =====================================================================

    #[tokio::test]
    async fn test_login_valid_credentials_creates_session() {
        let core = core();

        let token = core.login("alice", pw("secret")).await.expect("should log in");

        let session = core.sessions().lookup_by_token(&token).await.unwrap();
        assert_eq!(session.user(), &UserId::new("alice"));
        assert_eq!(core.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn test_login_twice_returns_same_token() {
        let core = core();

        let first = core.login("alice", pw("secret")).await.unwrap();
        let second = core.login("alice", pw("secret")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(core.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn test_login_wrong_password_creates_nothing() {
        let core = core();

        let result = core.login("alice", pw("wrong")).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(core.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_login_empty_password_skips_directory() {
        let core = core();

        let result = core.login("alice", pw("")).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert_eq!(core.directory().bind_count(), 0);
    }

    #[tokio::test]
    async fn test_login_empty_username_skips_directory() {
        let core = core();
        assert!(matches!(
            core.login("", pw("secret")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(core.directory().bind_count(), 0);
    }

    #[tokio::test]
    async fn test_login_directory_down_is_unavailable() {
        let core = core();
        core.directory().set_available(false);

        let result = core.login("alice", pw("secret")).await;

        assert!(matches!(result, Err(AuthError::DirectoryUnavailable(_))));
        assert!(core.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_login_differently_cased_uid_shares_session() {
        let core = core();

        let lower = core.login("alice", pw("secret")).await.unwrap();
        let upper = core.login("ALICE", pw("secret")).await.unwrap();

        assert_eq!(lower, upper);
        assert_eq!(core.sessions().len().await, 1);
        let session = core.sessions().lookup_by_token(&upper).await.unwrap();
        assert_eq!(session.user().as_str(), "alice");
    }

    #[tokio::test]
    async fn test_login_failure_is_logged_once() {
        let core = core();
        let errors = ErrorEvents::default();
        let _guard = errors.install();

        let err = core.login("alice", pw("wrong")).await.unwrap_err();
        let _ = err.into_response();

        assert_eq!(errors.count(), 1);
    }

    // =====================================================================
    // logout()
    // =====================================================================

    #[tokio::test]
    async fn test_logout_removes_session() {
        let core = core();
        let token = core.login("alice", pw("secret")).await.unwrap();

        core.logout(&token).await.expect("should log out");

        assert!(core.sessions().lookup_by_token(&token).await.is_none());
        assert!(core.sessions().lookup_by_identity(&"alice".into()).await.is_none());
    }

    #[tokio::test]
    async fn test_logout_twice_is_unknown_token() {
        let core = core();
        let token = core.login("alice", pw("secret")).await.unwrap();
        core.logout(&token).await.unwrap();

        assert!(matches!(
            core.logout(&token).await,
            Err(AuthError::UnknownToken)
        ));
    }

    // =====================================================================
    // authorize()
    // =====================================================================

    #[tokio::test]
    async fn test_authorize_unknown_token_never_calls_directory() {
        let core = core();

        let result = core.authorize(&"never-issued".into()).await;

        assert!(matches!(result, Err(AuthError::UnknownToken)));
        assert_eq!(core.directory().bind_count(), 0);
    }

    #[tokio::test]
    async fn test_authorize_rebinds_every_time() {
        let core = core();
        let token = core.login("alice", pw("secret")).await.unwrap();

        core.authorize(&token).await.unwrap();
        core.authorize(&token).await.unwrap();

        // One bind for login, one per authorize.
        assert_eq!(core.directory().bind_count(), 3);
    }

    #[tokio::test]
    async fn test_authorize_after_out_of_band_reset_fails_but_keeps_session() {
        let core = core();
        let token = core.login("alice", pw("secret")).await.unwrap();
        core.directory()
            .reset_password(&UserId::new("alice"), "rotated")
            .await;

        let result = core.authorize(&token).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(core.sessions().lookup_by_token(&token).await.is_some());
    }

    #[tokio::test]
    async fn test_authorize_rejected_rebind_is_logged_once() {
        let core = core();
        let token = core.login("alice", pw("secret")).await.unwrap();
        core.directory()
            .reset_password(&UserId::new("alice"), "rotated")
            .await;
        let errors = ErrorEvents::default();
        let _guard = errors.install();

        let err = core.update_property(&token, "mail", "x@y.z").await.unwrap_err();
        let _ = err.into_response();

        assert_eq!(errors.count(), 1);
    }

    // =====================================================================
    // update_property() / change_password()
    // =====================================================================

    #[tokio::test]
    async fn test_update_property_writes_as_session_user() {
        let core = core();
        let token = core.login("alice", pw("secret")).await.unwrap();

        core.update_property(&token, "mail", "alice@new.org").await.unwrap();

        let alice = core.profile(&UserId::new("alice")).await.unwrap();
        assert_eq!(alice.email, "alice@new.org");
        assert_eq!(core.directory().modify_count(), 1);
    }

    #[tokio::test]
    async fn test_update_property_unknown_token_modifies_nothing() {
        let core = core();

        let result = core.update_property(&"bogus".into(), "mail", "x").await;

        assert!(matches!(result, Err(AuthError::UnknownToken)));
        assert_eq!(core.directory().modify_count(), 0);
    }

    #[tokio::test]
    async fn test_update_property_empty_name_is_malformed() {
        let core = core();
        let token = core.login("alice", pw("secret")).await.unwrap();

        let result = core.update_property(&token, " ", "x").await;

        assert!(matches!(result, Err(AuthError::MalformedRequest(_))));
        assert_eq!(core.directory().modify_count(), 0);
    }

    #[tokio::test]
    async fn test_change_password_destroys_session() {
        let core = core();
        let token = core.login("bob", pw("hunter2")).await.unwrap();

        core.change_password(&token, pw("correct horse")).await.unwrap();

        assert!(core.sessions().lookup_by_token(&token).await.is_none());
        assert!(core.login("bob", pw("hunter2")).await.is_err());
        assert!(core.login("bob", pw("correct horse")).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_empty_is_malformed() {
        let core = core();
        let token = core.login("bob", pw("hunter2")).await.unwrap();

        let result = core.change_password(&token, pw("")).await;

        assert!(matches!(result, Err(AuthError::MalformedRequest(_))));
        assert!(core.sessions().lookup_by_token(&token).await.is_some());
    }

    // =====================================================================
    // profile() / profiles() / status() / sessions_report()
    // =====================================================================

    #[tokio::test]
    async fn test_profile_missing_user_is_not_found() {
        let result = core().profile(&UserId::new("nobody")).await;
        assert!(matches!(result, Err(AuthError::ProfileNotFound(_))));
    }

    #[tokio::test]
    async fn test_profiles_lists_everyone() {
        let profiles = core().profiles().await.unwrap();
        assert_eq!(profiles.len(), 2);
    }

    #[tokio::test]
    async fn test_status_follows_directory_availability() {
        let core = core();
        assert!(core.status().await);

        core.directory().set_available(false);
        assert!(!core.status().await);
    }

    #[tokio::test]
    async fn test_sessions_report_shows_digest_only() {
        let core = core();
        core.login("alice", pw("secret")).await.unwrap();
        core.login("bob", pw("hunter2")).await.unwrap();

        let report = core.sessions_report().await;

        assert_eq!(report.count, 2);
        assert_eq!(report.sessions[0].username, UserId::new("alice"));
        assert_eq!(
            report.sessions[0].password_digest,
            poisson_session::token::digest(&pw("secret"))
        );
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_sessions_report_hides_expired() {
        let directory = MemoryDirectory::new()
            .with_user(profile("alice", UserRole::Doctoral), "secret");
        let core = AuthCore::new(
            directory,
            SessionConfig {
                max_age: Some(Duration::ZERO),
            },
        );
        core.login("alice", pw("secret")).await.unwrap();

        assert_eq!(core.sessions_report().await.count, 0);
    }
}
