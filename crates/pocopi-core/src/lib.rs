// crates/pocopi-core/src/lib.rs
// ============================================================================
// Module: PoCoPI Core Library
// Description: Public API surface for the PoCoPI core.
// Purpose: Expose the configuration model, session runtime, and sinks.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! PoCoPI core holds the psychometric test model: a parsed configuration with
//! weighted group assignment, the participant session state machine, and the
//! timelog and summary types shared by the HTTP backend and the CLI. It is
//! transport-agnostic and performs no I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::SinkError;
pub use interfaces::TimelogSink;
pub use runtime::FlowState;
pub use runtime::InMemoryTimelogSink;
pub use runtime::NavigationError;
pub use runtime::SummaryEntry;
pub use runtime::TestSession;
