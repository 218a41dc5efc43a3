// crates/pocopi-server/src/audit.rs
// ============================================================================
// Module: Request Audit Logging
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit one JSON line per request without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events record what was requested and how it ended, never request
//! bodies. Sinks write JSON lines to stderr, to an append-only file, or
//! nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// HTTP request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Server-issued request id.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Matched route template, or the raw path when unmatched.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Declared request body size in bytes.
    pub request_bytes: Option<u64>,
    /// Declared response body size in bytes.
    pub response_bytes: Option<u64>,
    /// Handling latency in milliseconds.
    pub latency_ms: u64,
}

/// Inputs required to construct a request audit event.
pub struct RequestAuditEventParams {
    /// Server-issued request id.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Route template or raw path.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Declared request body size in bytes.
    pub request_bytes: Option<u64>,
    /// Declared response body size in bytes.
    pub response_bytes: Option<u64>,
    /// Handling latency in milliseconds.
    pub latency_ms: u64,
}

impl RequestAuditEvent {
    /// Creates a new request audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: RequestAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "http_request",
            timestamp_ms,
            request_id: params.request_id,
            method: params.method,
            route: params.route,
            status: params.status,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
            latency_ms: params.latency_ms,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for request events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &RequestAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &RequestAuditEvent) {}
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::AuditSink;
    use super::FileAuditSink;
    use super::RequestAuditEvent;
    use super::RequestAuditEventParams;

    #[test]
    fn file_sink_appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        for status in [200, 404] {
            sink.record(&RequestAuditEvent::new(RequestAuditEventParams {
                request_id: "req-1".to_string(),
                method: "GET".to_string(),
                route: "/api/ping".to_string(),
                status,
                request_bytes: None,
                response_bytes: Some(18),
                latency_ms: 1,
            }));
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "http_request");
        assert_eq!(lines[1]["status"], 404);
    }
}
