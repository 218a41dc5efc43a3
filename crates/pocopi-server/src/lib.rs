// crates/pocopi-server/src/lib.rs
// ============================================================================
// Module: PoCoPI Server Library
// Description: HTTP and WebSocket backend for PoCoPI studies.
// Purpose: Register participants and persist questionnaires and timelogs.
// Dependencies: axum, pocopi-config, pocopi-core, tokio, tracing
// ============================================================================

//! ## Overview
//! The server exposes the REST endpoints consumed by the test frontend plus a
//! best-effort WebSocket for live option events. State lives in an explicit
//! [`AppContext`]; results are persisted through a [`ResultStore`].
//!
//! Security posture: request bodies are untrusted and size-limited, user ids
//! are restricted to path-safe characters before touching the filesystem,
//! and internal errors are never rendered to clients.

pub mod audit;
pub mod context;
pub mod dto;
pub mod error;
pub mod request_id;
pub mod routes;
pub mod server;
pub mod store;
pub mod validation;
pub mod ws;

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::StderrAuditSink;
pub use context::AppContext;
pub use dto::FormKind;
pub use dto::FormSubmission;
pub use dto::OptionEventNotice;
pub use dto::User;
pub use error::ApiError;
pub use request_id::REQUEST_ID_HEADER;
pub use server::PocopiServer;
pub use server::ServerError;
pub use store::FileResultStore;
pub use store::InMemoryResultStore;
pub use store::ResultStore;
pub use store::StoreError;
