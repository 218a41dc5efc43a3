// crates/pocopi-server/tests/common/mod.rs
// =============================================================================
// Module: Server Test Helpers
// Description: Ephemeral-port server fixtures and request helpers.
// Purpose: Reduce duplication across integration tests for pocopi-server.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::expect_used, reason = "Fixtures panic on malformed setup.")]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use futures_util::SinkExt;
use futures_util::StreamExt;

use pocopi_config::load_test_config;
use pocopi_core::Config;
use pocopi_server::AppContext;
use pocopi_server::AuditSink;
use pocopi_server::InMemoryResultStore;
use pocopi_server::PocopiServer;
use pocopi_server::RequestAuditEvent;
use pocopi_server::ResultStore;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Default body limit used by fixtures.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Path of the sample study shipped with the repository.
pub fn sample_study_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/pocopi.yaml")
}

/// Loads the sample study.
pub fn sample_config() -> Config {
    load_test_config(&sample_study_path()).expect("sample study")
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events.
    events: Mutex<Vec<RequestAuditEvent>>,
}

impl RecordingAuditSink {
    /// Returns a snapshot of recorded events.
    pub fn events(&self) -> Vec<RequestAuditEvent> {
        self.events.lock().expect("audit lock").clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}

/// Server running on an ephemeral loopback port.
pub struct TestServer {
    /// Base URL such as `http://127.0.0.1:PORT`.
    pub base_url: String,
    /// Shared handler state.
    pub context: Arc<AppContext>,
    /// Recorded audit events.
    pub audit: Arc<RecordingAuditSink>,
    /// HTTP client.
    pub client: reqwest::Client,
    /// Serve task.
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    /// Returns an absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Builds a WebSocket URL for `path`.
    pub fn ws_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.replacen("http://", "ws://", 1))
    }

    /// Returns the result store behind the server.
    pub fn store(&self) -> Arc<dyn ResultStore> {
        self.context.store()
    }

    /// Sends `GET path`.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("get request")
    }

    /// Sends `POST path` with a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(body).send().await.expect("post request")
    }
}

/// Starts a server over the sample study with an in-memory store.
pub async fn spawn_memory() -> TestServer {
    spawn_with(Arc::new(InMemoryResultStore::new()), DEFAULT_BODY_LIMIT).await
}

/// Starts a server over the sample study with the given store and body limit.
pub async fn spawn_with(store: Arc<dyn ResultStore>, max_body_bytes: usize) -> TestServer {
    let audit = Arc::new(RecordingAuditSink::default());
    let context = AppContext::new(sample_config(), store, audit.clone(), max_body_bytes)
        .expect("app context");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let server = PocopiServer::new(context, addr);
    let context = Arc::clone(server.context());
    let handle = tokio::spawn(async move {
        let _ = server.serve_on(listener).await;
    });
    TestServer {
        base_url: format!("http://{addr}"),
        context,
        audit,
        client: reqwest::Client::new(),
        handle,
    }
}

/// Opens `/ws/option-event`, sends `frames` as text, then closes and waits
/// until the server has dropped the connection.
pub async fn send_option_frames(server: &TestServer, frames: &[&str]) {
    let url = server.ws_url("/ws/option-event");
    let (mut socket, _) = connect_async(url.as_str()).await.expect("websocket connect");
    for frame in frames {
        socket.send(Message::text((*frame).to_string())).await.expect("websocket send");
    }
    socket.close(None).await.expect("websocket close");
    let drain = async { while let Some(Ok(_)) = socket.next().await {} };
    tokio::time::timeout(Duration::from_secs(5), drain).await.expect("websocket drained");
}

/// Reads a JSON response body.
pub async fn json(response: reqwest::Response) -> Value {
    response.json().await.expect("json body")
}

/// Reads the `message` of an error response.
pub async fn error_message(response: reqwest::Response) -> String {
    json(response).await["message"].as_str().expect("error message").to_string()
}
