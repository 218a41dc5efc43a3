// crates/pocopi-server/src/ws.rs
// ============================================================================
// Module: Option Event Socket
// Description: WebSocket endpoint receiving live option interactions.
// Purpose: Accept best-effort option events and fan them out in-process.
// Dependencies: axum, serde_json, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! Clients send text frames shaped `{optionId, username, type}`. Valid frames
//! are stamped with the receive time, published on the context's broadcast
//! channel, and logged at `info` whether or not anyone is subscribed.
//! Invalid frames are logged at `debug` and dropped. Nothing is ever
//! acknowledged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;
use axum::response::Response;
use pocopi_core::Timestamp;
use serde_json::Value;
use thiserror::Error;

use crate::context::AppContext;
use crate::dto::OptionEventNotice;
use crate::validation::ValidationErrors;
use crate::validation::validate_option_event;

// ============================================================================
// SECTION: Frames
// ============================================================================

/// Rejected option event frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame is not JSON.
    #[error("frame is not valid JSON: {0}")]
    Json(String),
    /// Frame failed validation.
    #[error("{0}")]
    Invalid(ValidationErrors),
}

/// Parses a text frame into an option event notice.
///
/// # Errors
///
/// Returns [`FrameError`] when the frame is not a valid option event.
pub fn parse_option_event(
    text: &str,
    received_at: Timestamp,
) -> Result<OptionEventNotice, FrameError> {
    let value: Value = serde_json::from_str(text).map_err(|err| FrameError::Json(err.to_string()))?;
    let frame = validate_option_event(&value).map_err(FrameError::Invalid)?;
    Ok(OptionEventNotice {
        option_id: frame.option_id,
        username: frame.username,
        kind: frame.kind,
        received_at,
    })
}

/// Returns the current wall-clock time.
fn now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default();
    Timestamp::from_millis(millis)
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Upgrades `GET /ws/option-event` to a WebSocket.
pub async fn option_events(
    State(context): State<Arc<AppContext>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| receive(context, socket))
}

/// Consumes frames until the client disconnects.
async fn receive(context: Arc<AppContext>, mut socket: WebSocket) {
    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Text(text)) => match parse_option_event(text.as_str(), now()) {
                Ok(notice) => {
                    let option_id = notice.option_id;
                    let username = notice.username.clone();
                    let kind = notice.kind.as_str();
                    let subscribers = context.publish_option_event(notice);
                    tracing::info!(
                        option_id = %option_id,
                        username = %username,
                        kind,
                        subscribers,
                        "option event received"
                    );
                }
                Err(error) => tracing::debug!(error = %error, "option event frame dropped"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(error = %error, "option event socket closed");
                break;
            }
        }
    }
}
