// crates/pocopi-core/src/interfaces/mod.rs
// ============================================================================
// Module: PoCoPI Interfaces
// Description: Backend-agnostic sinks used by the session runtime.
// Purpose: Decouple test sessions from the transport that delivers analytics.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Sessions hand completed timelogs to a [`TimelogSink`]. Delivery is
//! fire-and-forget: a sink error is logged by the caller and never blocks
//! navigation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::TimelogRecord;

// ============================================================================
// SECTION: Timelog Sink
// ============================================================================

/// Timelog delivery errors.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink could not accept the record.
    #[error("timelog sink error: {0}")]
    Sink(String),
}

/// Destination for completed timelogs.
pub trait TimelogSink: Send + Sync {
    /// Delivers a completed timelog.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the record cannot be delivered.
    fn send(&self, record: TimelogRecord) -> Result<(), SinkError>;
}
