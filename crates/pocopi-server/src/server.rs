// crates/pocopi-server/src/server.rs
// ============================================================================
// Module: PoCoPI Server
// Description: Server assembly from configuration and the serve loop.
// Purpose: Wire stores, audit sinks, and routes into a running listener.
// Dependencies: axum, pocopi-config, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! [`PocopiServer::from_config`] validates the server configuration, loads
//! the test configuration, and builds the [`AppContext`]. Configuration
//! problems fail startup; nothing is served with a partially valid setup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use pocopi_config::ConfigError;
use pocopi_config::PocopiConfig;
use pocopi_config::StorageKind;
use pocopi_config::load_test_config;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::context::AppContext;
use crate::routes::router;
use crate::store::FileResultStore;
use crate::store::InMemoryResultStore;
use crate::store::ResultStore;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and transport failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration was rejected.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or connection failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<ConfigError> for ServerError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Configured PoCoPI HTTP server.
pub struct PocopiServer {
    /// Shared handler state.
    context: Arc<AppContext>,
    /// Listen address.
    bind: SocketAddr,
}

impl PocopiServer {
    /// Builds a server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration, the test configuration,
    /// the result store, or the audit sink cannot be set up.
    pub fn from_config(config: &PocopiConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let bind = config.server.bind_addr()?;
        let test_config = load_test_config(Path::new(&config.test.path))?;
        let store: Arc<dyn ResultStore> = match config.storage.kind {
            StorageKind::File => Arc::new(
                FileResultStore::open(&config.storage.data_dir)
                    .map_err(|err| ServerError::Init(err.to_string()))?,
            ),
            StorageKind::Memory => Arc::new(InMemoryResultStore::new()),
        };
        let audit: Arc<dyn AuditSink> = match (config.audit.enabled, &config.audit.path) {
            (false, _) => Arc::new(NoopAuditSink),
            (true, Some(path)) => Arc::new(FileAuditSink::new(Path::new(path)).map_err(|err| {
                ServerError::Init(format!("audit log {path}: {err}"))
            })?),
            (true, None) => Arc::new(StderrAuditSink),
        };
        let context = AppContext::new(test_config, store, audit, config.server.max_body_bytes)?;
        tracing::info!(
            groups = context.config().groups().count(),
            protocols = context.config().protocols().count(),
            "server configured"
        );
        Ok(Self::new(context, bind))
    }

    /// Wraps an already built context.
    #[must_use]
    pub fn new(context: AppContext, bind: SocketAddr) -> Self {
        Self {
            context: Arc::new(context),
            bind,
        }
    }

    /// Returns the shared handler state.
    #[must_use]
    pub const fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    /// Returns the configured listen address.
    #[must_use]
    pub const fn bind(&self) -> SocketAddr {
        self.bind
    }

    /// Builds the application router.
    #[must_use]
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.context))
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("bind {} failed: {err}", self.bind)))?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when serving fails.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|err| ServerError::Transport(format!("listener address: {err}")))?;
        tracing::info!(addr = %local, "pocopi server listening");
        axum::serve(listener, self.router())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}
