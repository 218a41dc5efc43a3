// crates/pocopi-server/src/context.rs
// ============================================================================
// Module: Application Context
// Description: Explicitly built state shared by every request handler.
// Purpose: Hold configuration, stores, and generators without globals.
// Dependencies: pocopi-config, pocopi-core, tokio
// ============================================================================

//! ## Overview
//! [`AppContext`] is built once at startup and shared behind an `Arc`. It
//! owns the parsed test configuration, the result store, the audit sink, the
//! request id generator, and the broadcast channel that fans out live option
//! events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use pocopi_config::ConfigError;
use pocopi_config::TestConfigValidator;
use pocopi_core::Config;
use tokio::sync::broadcast;

use crate::audit::AuditSink;
use crate::dto::OptionEventNotice;
use crate::request_id::RequestIdGenerator;
use crate::store::ResultStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Buffered option events per subscriber before the oldest are dropped.
const OPTION_EVENT_CAPACITY: usize = 256;

/// Prefix of issued request ids.
const REQUEST_ID_PREFIX: &str = "pocopi";

// ============================================================================
// SECTION: Context
// ============================================================================

/// Shared state for request handlers.
pub struct AppContext {
    /// Parsed test configuration.
    config: Arc<Config>,
    /// Compiled schema validator for candidate configurations.
    validator: TestConfigValidator,
    /// Participant result persistence.
    store: Arc<dyn ResultStore>,
    /// Request audit sink.
    audit: Arc<dyn AuditSink>,
    /// Request id generator.
    request_ids: RequestIdGenerator,
    /// Live option event fan-out.
    option_events: broadcast::Sender<OptionEventNotice>,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
}

impl AppContext {
    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration schema fails to compile.
    pub fn new(
        config: Config,
        store: Arc<dyn ResultStore>,
        audit: Arc<dyn AuditSink>,
        max_body_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let (option_events, _) = broadcast::channel(OPTION_EVENT_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            validator: TestConfigValidator::new()?,
            store,
            audit,
            request_ids: RequestIdGenerator::new(REQUEST_ID_PREFIX),
            option_events,
            max_body_bytes,
        })
    }

    /// Returns the test configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the candidate configuration validator.
    #[must_use]
    pub const fn validator(&self) -> &TestConfigValidator {
        &self.validator
    }

    /// Returns a handle to the result store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn ResultStore> {
        Arc::clone(&self.store)
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    /// Returns the request id generator.
    #[must_use]
    pub const fn request_ids(&self) -> &RequestIdGenerator {
        &self.request_ids
    }

    /// Returns the maximum accepted request body size.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Subscribes to live option events.
    #[must_use]
    pub fn subscribe_option_events(&self) -> broadcast::Receiver<OptionEventNotice> {
        self.option_events.subscribe()
    }

    /// Publishes an option event; returns how many subscribers received it.
    ///
    /// With no subscribers the notice is dropped. The WebSocket handler logs
    /// every accepted notice at `info` so it still reaches the diagnostics.
    pub fn publish_option_event(&self, notice: OptionEventNotice) -> usize {
        self.option_events.send(notice).unwrap_or(0)
    }
}
