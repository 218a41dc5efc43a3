// crates/pocopi-core/src/runtime/sink.rs
// ============================================================================
// Module: PoCoPI In-Memory Timelog Sink
// Description: Collecting timelog sink for tests and local demos.
// Purpose: Provide a deterministic sink implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryTimelogSink`] keeps every delivered record in arrival order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::core::TimelogRecord;
use crate::interfaces::SinkError;
use crate::interfaces::TimelogSink;

// ============================================================================
// SECTION: In-Memory Sink
// ============================================================================

/// In-memory timelog sink for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTimelogSink {
    /// Delivered records protected by a mutex.
    records: Arc<Mutex<Vec<TimelogRecord>>>,
}

impl InMemoryTimelogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the delivered records.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the sink mutex is poisoned.
    pub fn records(&self) -> Result<Vec<TimelogRecord>, SinkError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| SinkError::Sink("timelog sink mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

impl TimelogSink for InMemoryTimelogSink {
    fn send(&self, record: TimelogRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Sink("timelog sink mutex poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}
