// crates/pocopi-server/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: REST handlers, request tracking middleware, and fallback.
// Purpose: Map PoCoPI endpoints onto validation, stores, and summaries.
// Dependencies: axum, pocopi-core, serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Handlers take raw body bytes and run the explicit validation pass
//! themselves, so every client error has the same `{statusCode, message}`
//! shape. Store calls run on the blocking pool. A single middleware issues
//! the request id, opens the request span, and records the audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::body::HttpBody;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use pocopi_core::Config;
use pocopi_core::GroupLabel;
use pocopi_core::Protocol;
use pocopi_core::ProtocolLabel;
use pocopi_core::UserId;
use pocopi_core::summarize;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::audit::RequestAuditEvent;
use crate::audit::RequestAuditEventParams;
use crate::context::AppContext;
use crate::dto::FormKind;
use crate::dto::UserCreated;
use crate::error::ApiError;
use crate::request_id::REQUEST_ID_HEADER;
use crate::store::ResultStore;
use crate::store::StoreError;
use crate::validation::validate_form;
use crate::validation::validate_timelog;
use crate::validation::validate_user;
use crate::ws;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the application router over a shared context.
///
/// Store operations run on the blocking pool, so a panicking store surfaces
/// as a join error and renders the generic 500. Handlers themselves contain
/// no panic paths and no catch-panic layer is installed.
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/config", get(public_config))
        .route("/api/config/validate", post(validate_config))
        .route("/api/users", post(create_user))
        .route("/api/users/{user_id}/summary", get(user_summary))
        .route("/api/forms/pretest", post(submit_pre_test))
        .route("/api/forms/postest", post(submit_post_test))
        .route("/api/timelogs", post(create_timelog))
        .route("/ws/option-event", get(ws::option_events))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(context.max_body_bytes()))
        .layer(middleware::from_fn_with_state(Arc::clone(&context), track_request))
        .with_state(context)
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Issues the request id, instruments the handler, and audits the outcome.
async fn track_request(
    State(context): State<Arc<AppContext>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let request_id = context.request_ids().issue();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |path| path.as_str().to_string());
    let request_bytes = content_length(request.headers());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        route = %route
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    let response_bytes =
        content_length(response.headers()).or_else(|| response.body().size_hint().exact());
    context.audit().record(&RequestAuditEvent::new(RequestAuditEventParams {
        request_id,
        method,
        route,
        status: response.status().as_u16(),
        request_bytes,
        response_bytes,
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }));
    response
}

/// Reads a declared `content-length`.
fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a request body as JSON.
fn json_body(body: Result<Bytes, BytesRejection>) -> Result<Value, ApiError> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|_| ApiError::BadRequest("request body must be valid JSON".to_string()))
}

/// Runs a store operation on the blocking pool.
async fn with_store<T, F>(context: &AppContext, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ResultStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = context.store();
    let outcome = tokio::task::spawn_blocking(move || operation(store.as_ref()))
        .await
        .map_err(|err| ApiError::Internal(format!("store task failed: {err}")))?;
    Ok(outcome?)
}

// ============================================================================
// SECTION: Ping & Config
// ============================================================================

/// Liveness response.
#[derive(Debug, Serialize)]
struct Pong {
    /// Always `pong`.
    message: &'static str,
}

/// Handles `GET /api/ping`.
async fn ping() -> Json<Pong> {
    Json(Pong {
        message: "pong",
    })
}

/// Public group entry.
#[derive(Debug, Serialize)]
struct PublicGroup<'a> {
    /// Group label.
    label: &'a GroupLabel,
    /// Declared weight.
    probability: f64,
    /// Protocol label.
    protocol: &'a ProtocolLabel,
}

/// Public view of the loaded configuration.
#[derive(Debug, Serialize)]
struct PublicConfig<'a> {
    /// Study title.
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    /// Study description.
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    /// Translation table.
    translations: &'a BTreeMap<String, String>,
    /// Groups in label order.
    groups: Vec<PublicGroup<'a>>,
    /// Protocols in label order.
    protocols: Vec<&'a Protocol>,
}

impl<'a> PublicConfig<'a> {
    /// Builds the view over a configuration.
    fn new(config: &'a Config) -> Self {
        Self {
            title: config.title(),
            description: config.description(),
            translations: config.translations(),
            groups: config
                .groups()
                .map(|group| PublicGroup {
                    label: group.label(),
                    probability: group.probability(),
                    protocol: &group.protocol().label,
                })
                .collect(),
            protocols: config.protocols().map(|protocol| &**protocol).collect(),
        }
    }
}

/// Handles `GET /api/config`.
async fn public_config(State(context): State<Arc<AppContext>>) -> Response {
    Json(PublicConfig::new(context.config())).into_response()
}

/// Handles `POST /api/config/validate`.
async fn validate_config(
    State(context): State<Arc<AppContext>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let candidate = json_body(body)?;
    let report = context.validator().validate(&candidate);
    tracing::info!(valid = report.valid, errors = report.errors.len(), "config validated");
    Ok(Json(report).into_response())
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Handles `POST /api/users`.
async fn create_user(
    State(context): State<Arc<AppContext>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let candidate = json_body(body)?;
    let new_user = validate_user(&candidate, context.config())?;
    let group = match &new_user.group {
        Some(label) => context.config().group(label).ok_or_else(|| {
            ApiError::BadRequest("group must reference a configured group".to_string())
        })?,
        None => context.config().sample_group(),
    };
    let user = new_user.into_user(group);
    let created = UserCreated::from(&user);
    with_store(&context, move |store| store.save_user(&user)).await?;
    tracing::info!(
        username = %created.username,
        group = %created.group,
        protocol = %created.protocol,
        "user registered"
    );
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Handles `GET /api/users/{userId}/summary`.
async fn user_summary(
    State(context): State<Arc<AppContext>>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = UserId::new(user_id);
    if !user_id.is_path_safe() {
        return Err(ApiError::BadRequest(format!("{user_id} is not a valid user id")));
    }
    let lookup = user_id.clone();
    let (user, timelogs) = with_store(&context, move |store| {
        let Some(user) = store.load_user(&lookup)? else {
            return Ok(None);
        };
        let timelogs = store.timelogs(&lookup)?;
        Ok(Some((user, timelogs)))
    })
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;
    let protocol = context.config().protocol(user.protocol()).ok_or_else(|| {
        ApiError::Internal(format!("protocol {} is no longer configured", user.protocol()))
    })?;
    Ok(Json(summarize(&user_id, protocol, &timelogs)).into_response())
}

// ============================================================================
// SECTION: Forms & Timelogs
// ============================================================================

/// Handles `POST /api/forms/pretest`.
async fn submit_pre_test(
    State(context): State<Arc<AppContext>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    submit_form(&context, FormKind::PreTest, body).await
}

/// Handles `POST /api/forms/postest`.
async fn submit_post_test(
    State(context): State<Arc<AppContext>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    submit_form(&context, FormKind::PostTest, body).await
}

/// Validates and stores a questionnaire submission.
async fn submit_form(
    context: &AppContext,
    kind: FormKind,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    let form = validate_form(&json_body(body)?)?;
    let user_id = form.user_id.clone();
    let answers = form.answers.len();
    with_store(context, move |store| store.save_form(kind, &form)).await?;
    tracing::info!(user_id = %user_id, form = kind.suffix(), answers, "form stored");
    Ok(StatusCode::CREATED)
}

/// Handles `POST /api/timelogs`.
async fn create_timelog(
    State(context): State<Arc<AppContext>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    let record = validate_timelog(&json_body(body)?, context.config())?;
    tracing::debug!(
        user_id = %record.user_id,
        question_id = %record.question_id,
        duration_ms = record.duration_ms(),
        "timelog received"
    );
    with_store(&context, move |store| store.append_timelog(&record)).await?;
    Ok(StatusCode::CREATED)
}

// ============================================================================
// SECTION: Fallback
// ============================================================================

/// Renders unknown routes as 404.
async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Cannot {method} {}", uri.path()))
}
