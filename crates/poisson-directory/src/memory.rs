//! In-process [`Directory`] for tests and local development.
//!
//! Behaves like a tiny LDAP server: users with passwords and attributes,
//! binds that can fail, and a switch to simulate an outage. Like LDAP's
//! `uid` attribute, user names match regardless of case. It also counts
//! calls, so tests can assert that an operation never reached the
//! directory at all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use poisson_protocol::{UserId, UserProfile, UserRole};
use tokio::sync::Mutex;

use crate::{Credentials, Directory, DirectoryError};

/// Map key for a uid: lowercased, the way LDAP compares `uid` values.
fn key(uid: &UserId) -> UserId {
    UserId::new(uid.as_str().to_lowercase())
}

struct Entry {
    password: String,
    profile: UserProfile,
    /// Attributes without a [`UserProfile`] field (`loginShell`, ...).
    extra: HashMap<String, String>,
}

/// A [`Directory`] kept entirely in memory.
///
/// ```rust
/// use poisson_directory::MemoryDirectory;
/// use poisson_protocol::{UserId, UserProfile, UserRole};
///
/// let dir = MemoryDirectory::new().with_user(
///     UserProfile {
///         username: UserId::new("alice"),
///         id: 1001,
///         name: "Alice".into(),
///         surname: "Liddell".into(),
///         email: "alice@example.org".into(),
///         description: UserRole::Doctoral,
///         full_name: "Alice Liddell".into(),
///     },
///     "secret",
/// );
/// assert_eq!(dir.bind_count(), 0);
/// ```
#[derive(Default)]
pub struct MemoryDirectory {
    /// Keyed by [`key`], so lookups ignore case.
    users: Mutex<HashMap<UserId, Entry>>,
    unavailable: AtomicBool,
    binds: AtomicUsize,
    modifies: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a user. Builder-style, for setting up fixtures.
    pub fn with_user(mut self, profile: UserProfile, password: &str) -> Self {
        self.users.get_mut().insert(
            key(&profile.username),
            Entry {
                password: password.to_string(),
                profile,
                extra: HashMap::new(),
            },
        );
        self
    }

    /// Simulates the directory going down (`false`) or coming back.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Changes a password behind the service's back, the way an
    /// administrator would.
    pub async fn reset_password(&self, uid: &UserId, password: &str) {
        if let Some(entry) = self.users.lock().await.get_mut(&key(uid)) {
            entry.password = password.to_string();
        }
    }

    /// Removes a user, like an account being deleted out-of-band.
    pub async fn remove_user(&self, uid: &UserId) {
        self.users.lock().await.remove(&key(uid));
    }

    /// Current value of one attribute, by its directory name.
    pub async fn attribute(&self, uid: &UserId, name: &str) -> Option<String> {
        let users = self.users.lock().await;
        let entry = users.get(&key(uid))?;
        let p = &entry.profile;
        match name {
            "uid" => Some(p.username.as_str().to_string()),
            "uidNumber" => Some(p.id.to_string()),
            "givenName" => Some(p.name.clone()),
            "sn" => Some(p.surname.clone()),
            "mail" => Some(p.email.clone()),
            "gecos" => Some(p.full_name.clone()),
            "description" => Some(p.description.as_str().to_string()),
            other => entry.extra.get(other).cloned(),
        }
    }

    /// Number of bind attempts seen, including the ones made by
    /// `modify` and `change_password`.
    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    /// Number of modify and password-change attempts seen.
    pub fn modify_count(&self) -> usize {
        self.modifies.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable(
                "connection refused".into(),
            ));
        }
        Ok(())
    }

    fn check_password(
        users: &HashMap<UserId, Entry>,
        credentials: &Credentials,
    ) -> Result<(), DirectoryError> {
        match users.get(&key(credentials.uid())) {
            Some(entry) if entry.password == credentials.password() => Ok(()),
            _ => Err(DirectoryError::InvalidCredentials),
        }
    }
}

impl Directory for MemoryDirectory {
    async fn ping(&self) -> Result<(), DirectoryError> {
        self.check_available()
    }

    async fn bind(
        &self,
        credentials: &Credentials,
    ) -> Result<(), DirectoryError> {
        self.check_available()?;
        self.binds.fetch_add(1, Ordering::SeqCst);
        Self::check_password(&*self.users.lock().await, credentials)
    }

    async fn find_user(
        &self,
        uid: &UserId,
    ) -> Result<UserProfile, DirectoryError> {
        self.check_available()?;
        self.users
            .lock()
            .await
            .get(&key(uid))
            .map(|entry| entry.profile.clone())
            .ok_or_else(|| DirectoryError::NotFound(uid.clone()))
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, DirectoryError> {
        self.check_available()?;
        let mut profiles: Vec<UserProfile> = self
            .users
            .lock()
            .await
            .values()
            .map(|entry| entry.profile.clone())
            .collect();
        profiles.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(profiles)
    }

    async fn modify(
        &self,
        credentials: &Credentials,
        attribute: &str,
        value: &str,
    ) -> Result<(), DirectoryError> {
        self.check_available()?;
        self.binds.fetch_add(1, Ordering::SeqCst);
        self.modifies.fetch_add(1, Ordering::SeqCst);

        let mut users = self.users.lock().await;
        Self::check_password(&users, credentials)?;
        let entry = users
            .get_mut(&key(credentials.uid()))
            .ok_or_else(|| DirectoryError::NotFound(credentials.uid().clone()))?;

        let profile = &mut entry.profile;
        match attribute {
            "uid" | "uidNumber" => {
                return Err(DirectoryError::Operation(format!(
                    "insufficient access rights to {attribute}"
                )));
            }
            "givenName" => profile.name = value.to_string(),
            "sn" => profile.surname = value.to_string(),
            "mail" => profile.email = value.to_string(),
            "gecos" => profile.full_name = value.to_string(),
            "description" => {
                profile.description = UserRole::from_description(value)
            }
            other => {
                entry.extra.insert(other.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    async fn change_password(
        &self,
        credentials: &Credentials,
        new_password: &str,
    ) -> Result<(), DirectoryError> {
        self.check_available()?;
        self.binds.fetch_add(1, Ordering::SeqCst);
        self.modifies.fetch_add(1, Ordering::SeqCst);

        let mut users = self.users.lock().await;
        Self::check_password(&users, credentials)?;
        if let Some(entry) = users.get_mut(&key(credentials.uid())) {
            entry.password = new_password.to_string();
        }
        Ok(())
    }
}
