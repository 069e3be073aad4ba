//! Error types for the poisson service.
//!
//! [`AuthError`] is what a request can fail with, and decides the HTTP
//! status. [`PoissonError`] is what startup can fail with; only those are
//! fatal.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use poisson_directory::DirectoryError;
use poisson_protocol::{ProtocolError, UserId};
use poisson_session::SessionError;
use serde::Serialize;

/// Why a request failed.
///
/// The `From` impls classify the lower layers' errors, so the `?`
/// operator is all the auth core needs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The directory rejected the bind, or the username or password was
    /// empty.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The directory couldn't be reached or failed the operation. The
    /// message is the directory's own.
    #[error("{0}")]
    DirectoryUnavailable(String),

    /// The token doesn't belong to a live session.
    #[error("unknown session token")]
    UnknownToken,

    /// No user with this uid.
    #[error("user {} not found", .0.as_str())]
    ProfileNotFound(UserId),

    /// The request body couldn't be decoded or is missing a field.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::UnknownToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::DirectoryUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidCredentials => Self::InvalidCredentials,
            DirectoryError::NotFound(uid) => Self::ProfileNotFound(uid),
            other => Self::DirectoryUnavailable(other.to_string()),
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnknownToken => Self::UnknownToken,
        }
    }
}

impl From<ProtocolError> for AuthError {
    fn from(err: ProtocolError) -> Self {
        Self::MalformedRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Startup failures.
#[derive(Debug, thiserror::Error)]
pub enum PoissonError {
    /// Settings couldn't be loaded or are incomplete.
    #[error("invalid settings: {0}")]
    Settings(#[from] config::ConfigError),

    /// `listen_addr` isn't a socket address.
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    /// Binding the listener or serving failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
