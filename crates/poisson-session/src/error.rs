//! Error types for the session layer.

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session has this token: it was never issued, the user
    /// logged out, or the session expired.
    #[error("unknown session token")]
    UnknownToken,
}
