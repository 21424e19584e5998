//! # API REST
//!
//! REST API for register sync.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (status mapping, session header, CSV downloads, CORS)
//!
//! Uses `api-shared` for models, the passcode gate and sessions, and `sync-core` for the
//! reconciliation itself. The binary that binds a listener lives at the workspace root.

#![warn(rust_2018_idioms)]

use api_shared::{
    parse_session_id, CohortSummary, HealthRes, HealthService, LoginReq, LoginRes, PasscodeGate,
    Session, SessionError, SessionStore, SyncRes,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use sync_core::{Cohort, Reconciler, SyncError};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Header carrying the session id issued by `POST /session`.
pub const SESSION_HEADER: &str = "x-session-id";

type ApiError = (StatusCode, String);

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub passcode: Arc<PasscodeGate>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(reconciler: Reconciler, passcode: PasscodeGate, sessions: SessionStore) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            passcode: Arc::new(passcode),
            sessions,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, open_session, close_session, run_sync, download),
    components(schemas(HealthRes, LoginReq, LoginRes, SyncRes, CohortSummary))
)]
pub struct ApiDoc;

/// Builds the router with every endpoint, the OpenAPI document and Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", post(open_session))
        .route("/session", delete(close_session))
        .route("/sync", post(run_sync))
        .route("/downloads/:cohort", get(download))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves the session named by the request headers, refreshing its expiry.
fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let value = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "missing session".to_owned()))?;

    parse_session_id(value)
        .and_then(|id| state.sessions.touch(id))
        .map_err(session_rejection)
}

fn session_rejection(err: SessionError) -> ApiError {
    (StatusCode::UNAUTHORIZED, err.to_string())
}

/// Maps a sync failure onto a status code.
///
/// Source failures are the upstream service's problem (502); data-shape failures mean the sheet
/// or database needs fixing (422).
fn sync_rejection(err: &SyncError) -> ApiError {
    let status = match err {
        SyncError::Source(_) => StatusCode::BAD_GATEWAY,
        e if e.is_data_shape() => StatusCode::UNPROCESSABLE_ENTITY,
        SyncError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/session",
    request_body = LoginReq,
    responses(
        (status = 201, description = "Session opened", body = LoginRes),
        (status = 401, description = "Wrong passcode")
    )
)]
/// Exchange the passcode for a session id.
///
/// Every other authenticated endpoint expects the returned id in the `x-session-id` header.
#[axum::debug_handler]
async fn open_session(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<(StatusCode, Json<LoginRes>), ApiError> {
    state.sessions.purge_expired();

    state
        .passcode
        .verify(&req.passcode)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let session = state.sessions.open();
    Ok((
        StatusCode::CREATED,
        Json(LoginRes {
            session_id: session.id.to_string(),
            expires_at: session.expires_at.to_rfc3339(),
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/session",
    params(("x-session-id" = String, Header, description = "Session id from POST /session")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Missing, unknown or expired session")
    )
)]
/// End the current session.
#[axum::debug_handler]
async fn close_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers)?;
    state.sessions.close(session.id);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/sync",
    params(("x-session-id" = String, Header, description = "Session id from POST /session")),
    responses(
        (status = 200, description = "Every cohort reconciled", body = SyncRes),
        (status = 401, description = "Missing, unknown or expired session"),
        (status = 422, description = "A register or tracked table has the wrong shape"),
        (status = 502, description = "Google Sheets or Notion failed")
    )
)]
/// Fetch every register and tracked table and compute the intervention lists.
///
/// The outcome replaces any earlier one held by this session and backs `/downloads/{cohort}`.
#[axum::debug_handler]
async fn run_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncRes>, ApiError> {
    let session = require_session(&state, &headers)?;

    let outcome = state.reconciler.sync().await.map_err(|e| {
        tracing::error!("Sync error: {}", e);
        sync_rejection(&e)
    })?;
    let res = SyncRes::from(&outcome);

    state
        .sessions
        .record_sync(session.id, Arc::new(outcome))
        .map_err(session_rejection)?;

    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/downloads/{cohort}",
    params(
        ("cohort" = String, Path, description = "diabetes or smi"),
        ("x-session-id" = String, Header, description = "Session id from POST /session")
    ),
    responses(
        (status = 200, description = "Intervention list", body = String, content_type = "text/csv"),
        (status = 401, description = "Missing, unknown or expired session"),
        (status = 404, description = "Unknown cohort, or no sync run in this session")
    )
)]
/// Download one cohort's intervention list from this session's latest sync.
#[axum::debug_handler]
async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cohort): Path<String>,
) -> Result<Response, ApiError> {
    let session = require_session(&state, &headers)?;

    let cohort: Cohort = cohort
        .parse()
        .map_err(|e: SyncError| (StatusCode::NOT_FOUND, e.to_string()))?;
    let outcome = session.last_sync.as_ref().ok_or((
        StatusCode::NOT_FOUND,
        "no sync has been run in this session".to_owned(),
    ))?;
    let cohort_outcome = outcome.cohort(cohort).ok_or((
        StatusCode::NOT_FOUND,
        format!("cohort '{cohort}' is not configured"),
    ))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", cohort_outcome.filename),
            ),
        ],
        cohort_outcome.csv.clone(),
    )
        .into_response())
}
