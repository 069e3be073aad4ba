//! Codec trait and implementations for request bodies.
//!
//! A codec turns raw bytes into Rust types.
//! The HTTP layer reads request bodies as bytes and hands them to a
//! [`Codec`], so a body that fails to parse becomes a
//! [`ProtocolError::Decode`] we control, instead of a framework-specific
//! rejection with its own status code and wording.

use serde::de::DeserializeOwned;

use crate::ProtocolError;

/// A codec that decodes request bodies into Rust types.
///
/// `Send + Sync + 'static` because the codec sits in the shared server
/// state and is used from every request task.
pub trait Codec: Send + Sync + 'static {
    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type, and
    /// `ProtocolError::InvalidMessage` for an empty body.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use poisson_protocol::{Codec, JsonCodec, LogoutRequest};
///
/// let codec = JsonCodec;
/// let req: LogoutRequest = codec.decode(br#"{"token":"abc"}"#).unwrap();
/// assert_eq!(req.token, "abc");
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::InvalidMessage("empty body".into()));
        }
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
