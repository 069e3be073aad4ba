//! `PoissonServer` builder and serve loop.
//!
//! This is the entry point for running the service. It ties the layers
//! together: HTTP → codec → auth core → sessions and directory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use poisson_directory::Directory;
use poisson_protocol::{Codec, JsonCodec};
use poisson_session::SessionConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::router;
use crate::{AuthCore, PoissonError};

/// How often expired sessions are swept when `max_age` is set. Lookups
/// already ignore them; the sweep just gives the memory back.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared state handed to every request handler.
pub(crate) struct ServerState<D: Directory, C: Codec> {
    pub(crate) core: AuthCore<D>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a poisson server.
///
/// # Example
///
/// ```rust,ignore
/// use poisson::prelude::*;
///
/// let server = PoissonServerBuilder::new()
///     .bind("0.0.0.0:5353")
///     .build(MemoryDirectory::new())
///     .await?;
/// server.run().await
/// ```
pub struct PoissonServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    request_timeout: Duration,
}

impl PoissonServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5353".to_string(),
            session_config: SessionConfig::default(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Upper bound for handling one request, directory calls included.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server around `directory`.
    ///
    /// Uses `JsonCodec` for request bodies.
    pub async fn build<D: Directory>(
        self,
        directory: D,
    ) -> Result<PoissonServer<D, JsonCodec>, PoissonError> {
        let addr: SocketAddr = self
            .bind_addr
            .parse()
            .map_err(|_| PoissonError::InvalidAddress(self.bind_addr.clone()))?;
        let listener = TcpListener::bind(addr).await?;

        let state = Arc::new(ServerState {
            core: AuthCore::new(directory, self.session_config),
            codec: JsonCodec,
        });

        Ok(PoissonServer {
            listener,
            state,
            request_timeout: self.request_timeout,
        })
    }
}

impl Default for PoissonServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound poisson server.
///
/// Call [`run()`](Self::run) to start serving requests.
pub struct PoissonServer<D: Directory, C: Codec> {
    listener: TcpListener,
    state: Arc<ServerState<D, C>>,
    request_timeout: Duration,
}

impl<D, C> PoissonServer<D, C>
where
    D: Directory,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until the process is terminated.
    ///
    /// With a session `max_age` configured, also runs a task that sweeps
    /// expired sessions every [`PURGE_INTERVAL`]. The task stops when
    /// this returns.
    pub async fn run(self) -> Result<(), PoissonError> {
        let _purge = PurgeTask::spawn(&self.state);

        let app = router(Arc::clone(&self.state))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.request_timeout,
            ))
            .layer(TraceLayer::new_for_http());

        tracing::info!(addr = ?self.listener.local_addr().ok(), "poisson server running");
        axum::serve(self.listener, app).await?;
        Ok(())
    }
}

/// The expired-session sweep. Aborted on drop, so it never outlives the
/// server that started it.
struct PurgeTask(JoinHandle<()>);

impl PurgeTask {
    /// Starts the sweep, or returns `None` when sessions don't expire.
    fn spawn<D: Directory, C: Codec>(
        state: &Arc<ServerState<D, C>>,
    ) -> Option<Self> {
        state.core.sessions().config().max_age?;

        let state = Arc::clone(state);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                let purged = state.core.sessions().purge_expired().await;
                if !purged.is_empty() {
                    tracing::debug!(count = purged.len(), "purged expired sessions");
                }
            }
        });
        Some(Self(handle))
    }
}

impl Drop for PurgeTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
