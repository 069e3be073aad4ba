//! Session tracking for Poisson.
//!
//! A successful login becomes a [`Session`]: the user, the password they
//! bound with, and a random bearer token. [`SessionStore`] keeps every live
//! session indexed both by token and by user, so a repeat login hands back
//! the existing token and a privileged call can go from token to
//! credentials in one lookup.
//!
//! # How it fits in the stack
//!
//! ```text
//! Auth core (above)  ← creates sessions on login, resolves tokens on every call
//!     ↕
//! Session layer (this crate)  ← token ⇄ user, nothing else
//!     ↕
//! Protocol layer (below)  ← provides UserId
//! ```
//!
//! This crate never talks to the directory. Checking that a session's
//! password is still valid is the auth core's job.

mod error;
mod session;
mod store;
pub mod token;

pub use error::SessionError;
pub use session::{Session, SessionConfig, SessionToken};
pub use store::SessionStore;
