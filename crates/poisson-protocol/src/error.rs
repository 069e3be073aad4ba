//! Error types for the protocol layer.
//!
//! Each crate in poisson defines its own error enum. A `ProtocolError`
//! always means the bytes were wrong, never the directory or a session.

/// Errors that can occur while decoding request bodies.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Deserialization failed: malformed JSON, missing required fields,
    /// or wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body parsed (or was empty) but isn't a usable request.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
