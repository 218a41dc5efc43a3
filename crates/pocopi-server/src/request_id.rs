// crates/pocopi-server/src/request_id.rs
// ============================================================================
// Module: Request Identifiers
// Description: Boot-scoped generator for server-issued request ids.
// Purpose: Tag every response and audit record with a unique identifier.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Request ids combine a random boot identifier with a monotonic counter, so
//! they are unique within a process and unlikely to collide across restarts.
//! The generator lives in the application context; there is no global
//! counter.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Boot-scoped request id generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct RequestIdGenerator {
    /// Prefix included in every identifier.
    prefix: &'static str,
    /// Random identifier chosen at construction.
    boot_id: u64,
    /// Monotonic counter for identifiers issued so far.
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a new generator with the given prefix.
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            boot_id: OsRng.next_u64(),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues the next request id.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:016x}-{:08x}", self.prefix, self.boot_id, seq)
    }
}
