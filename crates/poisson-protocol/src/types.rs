//! Core data types for poisson's wire format.
//!
//! Everything in here travels over HTTP as JSON: the user profiles we
//! hand out, and the request bodies clients send us. Directory-specific
//! details (attribute names, DNs) live in `poisson-directory`; this module
//! only knows the shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

use secrecy::Secret;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The directory `uid` of a user.
///
/// A newtype around `String` so a username can't be mixed up with a token
/// or a password in a function signature. `#[serde(transparent)]` makes it
/// serialize as a bare string: `UserId("alice")` becomes `"alice"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a raw uid.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the uid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty uid, which never names a real user.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(uid: &str) -> Self {
        Self::new(uid)
    }
}

// ---------------------------------------------------------------------------
// UserRole
// ---------------------------------------------------------------------------

/// The kind of account, taken from the directory's free-text
/// `description` attribute.
///
/// The directory doesn't constrain that attribute, so parsing never
/// fails: anything we don't recognize becomes [`UserRole::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UserRole {
    /// `studente` in the directory.
    #[serde(rename = "studente")]
    Student,

    /// `esterno` in the directory.
    #[serde(rename = "esterno")]
    External,

    /// `dottorando` in the directory.
    #[serde(rename = "dottorando")]
    Doctoral,

    /// Missing or unrecognized description.
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl UserRole {
    /// Maps a raw directory description onto a role.
    ///
    /// Matching ignores surrounding whitespace and ASCII case.
    pub fn from_description(description: &str) -> Self {
        let description = description.trim();
        if description.eq_ignore_ascii_case("studente") {
            Self::Student
        } else if description.eq_ignore_ascii_case("esterno") {
            Self::External
        } else if description.eq_ignore_ascii_case("dottorando") {
            Self::Doctoral
        } else {
            Self::Unknown
        }
    }

    /// The string stored in the directory for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "studente",
            Self::External => "esterno",
            Self::Doctoral => "dottorando",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// A snapshot of a user's directory attributes.
///
/// Built fresh for every query and never cached: the directory is the only
/// source of truth. Field names match the JSON the service has always
/// returned, which is why `full_name` is spelled `fullname` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// `uid`
    pub username: UserId,
    /// `uidNumber`
    pub id: u32,
    /// `givenName`
    pub name: String,
    /// `sn`
    pub surname: String,
    /// `mail`
    pub email: String,
    /// `description`
    pub description: UserRole,
    /// `gecos`
    #[serde(rename = "fullname")]
    pub full_name: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `POST /login` body.
///
/// Passwords are wrapped in [`Secret`] as soon as they're decoded, so a
/// stray `{:?}` prints `[REDACTED]` instead of the credential.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: Secret<String>,
}

/// `POST /logout` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// `POST /update` body: replace one attribute of the caller's entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateRequest {
    pub token: String,
    pub property: String,
    pub value: String,
}

/// `POST /password` body: set a new password for the caller.
#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub token: String,
    pub password: Secret<String>,
}

/// Query string of `GET /users`. No username means "everyone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UsersQuery {
    #[serde(default)]
    pub username: Option<String>,
}

impl UsersQuery {
    /// The requested user, treating `?username=` the same as no filter.
    pub fn user(&self) -> Option<UserId> {
        self.username
            .as_deref()
            .filter(|uid| !uid.is_empty())
            .map(UserId::from)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn alice() -> UserProfile {
        UserProfile {
            username: UserId::new("alice"),
            id: 1001,
            name: "Alice".into(),
            surname: "Liddell".into(),
            email: "alice@example.org".into(),
            description: UserRole::Doctoral,
            full_name: "Alice Liddell".into(),
        }
    }

    // =====================================================================
    // UserId
    // =====================================================================

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::new("alice")).unwrap();
        assert_eq!(json, r#""alice""#);
    }

    #[test]
    fn test_user_id_display_prefixes_at() {
        assert_eq!(UserId::new("bob").to_string(), "@bob");
    }

    // =====================================================================
    // UserRole
    // =====================================================================

    #[test]
    fn test_role_from_description_known_values() {
        assert_eq!(UserRole::from_description("studente"), UserRole::Student);
        assert_eq!(UserRole::from_description("esterno"), UserRole::External);
        assert_eq!(
            UserRole::from_description("dottorando"),
            UserRole::Doctoral
        );
    }

    #[test]
    fn test_role_from_description_ignores_case_and_whitespace() {
        assert_eq!(
            UserRole::from_description("  Dottorando\n"),
            UserRole::Doctoral
        );
    }

    #[test]
    fn test_role_from_description_unrecognized_is_unknown() {
        assert_eq!(UserRole::from_description("professore"), UserRole::Unknown);
        assert_eq!(UserRole::from_description(""), UserRole::Unknown);
        // The old misspelling never matched anything real.
        assert_eq!(UserRole::from_description("dottornado"), UserRole::Unknown);
    }

    #[test]
    fn test_role_deserializes_unrecognized_as_unknown() {
        let role: UserRole = serde_json::from_str(r#""admin""#).unwrap();
        assert_eq!(role, UserRole::Unknown);
    }

    #[test]
    fn test_role_display_matches_directory_string() {
        assert_eq!(UserRole::External.to_string(), "esterno");
        assert_eq!(UserRole::Unknown.to_string(), "unknown");
    }

    // =====================================================================
    // UserProfile
    // =====================================================================

    #[test]
    fn test_profile_json_field_names() {
        let value = serde_json::to_value(alice()).unwrap();
        assert_eq!(value["username"], "alice");
        assert_eq!(value["id"], 1001);
        assert_eq!(value["name"], "Alice");
        assert_eq!(value["surname"], "Liddell");
        assert_eq!(value["email"], "alice@example.org");
        assert_eq!(value["description"], "dottorando");
        assert_eq!(value["fullname"], "Alice Liddell");
    }

    // =====================================================================
    // Requests
    // =====================================================================

    #[test]
    fn test_login_request_debug_redacts_password() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"alice","password":"secret"}"#)
                .unwrap();
        assert_eq!(req.password.expose_secret(), "secret");
        assert!(!format!("{req:?}").contains("secret"));
    }

    #[test]
    fn test_login_request_missing_password_returns_error() {
        let result: Result<LoginRequest, _> =
            serde_json::from_str(r#"{"username":"alice"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_users_query_empty_username_means_everyone() {
        let query = UsersQuery {
            username: Some(String::new()),
        };
        assert_eq!(query.user(), None);
        assert_eq!(UsersQuery::default().user(), None);
    }

    #[test]
    fn test_users_query_with_username() {
        let query = UsersQuery {
            username: Some("alice".into()),
        };
        assert_eq!(query.user(), Some(UserId::new("alice")));
    }
}
