//! Wire types for poisson.
//!
//! This crate defines what clients and the server exchange:
//!
//! - **Types** ([`UserId`], [`UserProfile`], [`UserRole`], request
//!   bodies): the structures that travel as JSON.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how request bodies are
//!   turned into those types.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! ```text
//! HTTP (bytes) → Protocol (typed request) → AuthCore (sessions, directory)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    LoginRequest, LogoutRequest, PasswordRequest, UpdateRequest, UserId,
    UserProfile, UserRole, UsersQuery,
};
