// crates/pocopi-core/src/core/time.rs
// ============================================================================
// Module: PoCoPI Time Model
// Description: Canonical timestamp representation for timelogs and events.
// Purpose: Keep session transitions deterministic and replayable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The core never reads wall-clock time. Hosts supply timestamps to every
//! session transition, which keeps navigation tests deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch milliseconds supplied by the caller.
///
/// # Invariants
/// - No monotonicity is enforced; ordering is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the unix milliseconds value.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the elapsed milliseconds since `earlier`, saturating at zero.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}
