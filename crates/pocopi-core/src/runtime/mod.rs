// crates/pocopi-core/src/runtime/mod.rs
// ============================================================================
// Module: PoCoPI Runtime
// Description: Participant session state machine and timelog sinks.
// Purpose: Execute the test flow against a parsed protocol.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules drive a participant through a protocol and collect the
//! timelogs produced along the way.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod session;
pub mod sink;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use session::FlowState;
pub use session::NavigationError;
pub use session::SummaryEntry;
pub use session::TestSession;
pub use sink::InMemoryTimelogSink;
