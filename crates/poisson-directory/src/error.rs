use std::time::Duration;

use poisson_protocol::UserId;

/// Errors that can occur while talking to the directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// No connection could be opened, or it dropped mid-operation.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The directory rejected the bind.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A search for a single user matched nothing.
    #[error("user {0} not found")]
    NotFound(UserId),

    /// A search for a single user matched more than one entry.
    #[error("expected one entry for {uid}, got {count}")]
    Ambiguous { uid: UserId, count: usize },

    /// An entry came back without a usable attribute.
    #[error("malformed directory entry: {0}")]
    MalformedEntry(String),

    /// The directory answered, but refused or failed the operation.
    #[error("directory operation failed: {0}")]
    Operation(String),

    /// The operation didn't finish within the configured deadline.
    #[error("directory did not answer within {0:?}")]
    Timeout(Duration),
}
