//! Runtime settings, read from `POISSON_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use poisson_directory::DirectoryConfig;
use poisson_session::SessionConfig;
use serde::Deserialize;

use crate::PoissonError;

/// Everything the server binary needs to start.
///
/// | Variable | Default |
/// |---|---|
/// | `POISSON_LISTEN_ADDR` | `127.0.0.1:5353` |
/// | `POISSON_LDAP_URL` | `ldap://localhost:389` |
/// | `POISSON_LDAP_BASE_DN` | required |
/// | `POISSON_DIRECTORY_TIMEOUT_SECS` | `5` |
/// | `POISSON_REQUEST_TIMEOUT_SECS` | `10` |
/// | `POISSON_SESSION_MAX_AGE_SECS` | unset: sessions never expire |
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listen_addr: String,
    pub ldap_url: String,
    pub ldap_base_dn: String,
    pub directory_timeout_secs: u64,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub session_max_age_secs: Option<u64>,
}

impl Settings {
    /// Loads `.env` if there is one, then reads the environment.
    pub fn load() -> Result<Self, PoissonError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_env(Environment::with_prefix("POISSON").try_parsing(true))
    }

    fn from_env(env: Environment) -> Result<Self, PoissonError> {
        let settings: Settings = Config::builder()
            .set_default("listen_addr", "127.0.0.1:5353")?
            .set_default("ldap_url", "ldap://localhost:389")?
            .set_default("directory_timeout_secs", 5_i64)?
            .set_default("request_timeout_secs", 10_i64)?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), PoissonError> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(PoissonError::InvalidAddress(self.listen_addr.clone()));
        }
        if self.ldap_base_dn.trim().is_empty() {
            return Err(ConfigError::Message("ldap_base_dn is empty".into()).into());
        }
        Ok(())
    }

    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig::new(&self.ldap_url, &self.ldap_base_dn)
            .timeout(Duration::from_secs(self.directory_timeout_secs))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_age: self.session_max_age_secs.map(Duration::from_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
