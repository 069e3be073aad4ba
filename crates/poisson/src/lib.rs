//! # Poisson
//!
//! Session authentication in front of an LDAP directory.
//!
//! Clients log in with their directory credentials and get back an opaque
//! token. The token is all later calls need, but the service never trusts
//! it alone for writes: every privileged call binds to the directory again
//! as the session's user before doing anything.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use poisson::prelude::*;
//!
//! # async fn start() -> Result<(), PoissonError> {
//! let settings = Settings::load()?;
//! let directory = LdapDirectory::new(settings.directory_config());
//! let server = PoissonServerBuilder::new()
//!     .bind(&settings.listen_addr)
//!     .session_config(settings.session_config())
//!     .request_timeout(settings.request_timeout())
//!     .build(directory)
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Endpoints
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/status` | is the directory reachable |
//! | POST | `/login` | `{username, password}` → token |
//! | POST | `/logout` | `{token}` |
//! | GET | `/users` | `?username=<uid>`, or everyone |
//! | POST | `/update` | `{token, property, value}` |
//! | POST | `/password` | `{token, password}` |
//! | GET | `/debug` | live sessions, passwords as digests |

mod auth;
mod error;
mod handlers;
mod server;
mod settings;

pub use auth::{AuthCore, SessionInfo, SessionsReport};
pub use error::{AuthError, PoissonError};
pub use server::{PoissonServer, PoissonServerBuilder};
pub use settings::Settings;

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{
        AuthCore, AuthError, PoissonError, PoissonServer,
        PoissonServerBuilder, Settings,
    };
    pub use poisson_directory::{
        Credentials, Directory, DirectoryConfig, DirectoryError,
        MemoryDirectory,
    };
    #[cfg(feature = "ldap")]
    pub use poisson_directory::LdapDirectory;
    pub use poisson_protocol::{UserId, UserProfile, UserRole};
    pub use poisson_session::{SessionConfig, SessionToken};
}
