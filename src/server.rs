//!
//! vitrine HTTP server
//! -------------------
//! This module defines the Axum-based HTTP API for the showcase backend.
//!
//! Responsibilities:
//! - Bearer credential extraction and verification via the injected
//!   `IdentityVerifier`; public endpoints treat an invalid credential as an
//!   anonymous requester, protected endpoints answer 401.
//! - Thin handlers delegating to the per-endpoint operations in `api`, with
//!   `AppError` mapped to HTTP status exactly once at this boundary.
//! - Panic containment: operation panics become a generic 500 without
//!   crashing the server task, with detail logged server-side only.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::identity::{SharedVerifier, TokenDirectory, VerifiedUser};
use crate::model::ProjectFields;
use crate::storage::SharedStore;

pub mod api;

/// Shared server state injected into all handlers: the document store handle
/// and the identity verifier, both explicitly constructed at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub verifier: SharedVerifier,
}

fn parse_bearer(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let s = auth.to_str().ok()?;
    let rest = s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer "))?;
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Resolve the requester, if any. Missing or invalid credentials are simply
/// "no requester" here; protected handlers turn that into 401.
fn verified_user(state: &AppState, headers: &HeaderMap) -> Option<VerifiedUser> {
    let token = parse_bearer(headers)?;
    state.verifier.verify(&token)
}

fn unauthorized() -> (StatusCode, Json<serde_json::Value>) {
    error_response(AppError::unauthorized("no_credential", "missing or invalid credential"))
}

fn error_response(err: AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        // Log the detail, report a generic message
        error!("request failed: {}", err);
        return (status, Json(json!({"status":"error","code": err.code_str(), "message": "internal server error"})));
    }
    (status, Json(json!({"status":"error","code": err.code_str(), "message": err.message()})))
}

/// Run one endpoint operation with panic containment and map the outcome to a
/// response. `ok` is the success status (200 for most, 201 for creations).
fn respond<T: Serialize>(ok: StatusCode, op: impl FnOnce() -> AppResult<T>) -> (StatusCode, Json<serde_json::Value>) {
    match std::panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => match serde_json::to_value(&value) {
            Ok(body) => (ok, Json(body)),
            Err(e) => {
                error!("response serialization failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"status":"error","code":"internal_error","message":"internal server error"})))
            }
        },
        Ok(Err(e)) => error_response(e),
        Err(panic_payload) => {
            // Convert panics to a 500 error response without crashing the server task
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                      else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                      else { "panic" };
            error!(target: "panic", "handler panic: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                "status":"error",
                "code":"internal_panic",
                "message":"internal server error"
            })))
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RatePayload {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct CommentPayload {
    text: String,
}

async fn get_profile(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || api::fetch_profile(&state.store, &user))
}

async fn put_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<api::ProfileUpdate>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || api::update_profile(&state.store, &user, payload))
}

async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let requester = verified_user(&state, &headers);
    respond(StatusCode::OK, || {
        api::list_projects(&state.store, requester.as_ref().map(|u| u.subject_id.as_str()), params.page, params.limit)
    })
}

async fn my_projects(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || api::owned_projects(&state.store, &user))
}

async fn my_favorites(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || api::favorite_projects(&state.store, &user))
}

async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let requester = verified_user(&state, &headers);
    respond(StatusCode::OK, || {
        api::fetch_project(&state.store, &id, requester.as_ref().map(|u| u.subject_id.as_str()))
    })
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProjectFields>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::CREATED, || api::create_project(&state.store, &user, payload))
}

async fn update_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<ProjectFields>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || {
        let view = api::update_project(&state.store, &user, &id, payload)?;
        Ok(json!({"message": "project updated", "project": view}))
    })
}

async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || {
        api::delete_project(&state.store, &user, &id)?;
        Ok(json!({"message": "project deleted"}))
    })
}

async fn like_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || api::toggle_like(&state.store, &user, &id))
}

async fn favorite_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || api::toggle_favorite(&state.store, &user, &id))
}

async fn rate_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<RatePayload>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || api::rate_project(&state.store, &user, &id, payload.value))
}

async fn list_comments(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    respond(StatusCode::OK, || api::list_comments(&state.store, &id))
}

async fn post_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<CommentPayload>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::CREATED, || api::add_comment(&state.store, &user, &id, payload.text))
}

async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, comment_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let Some(user) = verified_user(&state, &headers) else { return unauthorized(); };
    respond(StatusCode::OK, || {
        api::delete_comment(&state.store, &user, &id, &comment_id)?;
        Ok(json!({"message": "comment deleted"}))
    })
}

/// Mount all routes. Literal sub-paths (`/projects/my`,
/// `/projects/favorites/my`) are registered ahead of the generic
/// `/projects/{id}` pattern so an id can never swallow them.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "vitrine ok" }))
        .route("/profile", get(get_profile).put(put_profile))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/my", get(my_projects))
        .route("/projects/favorites/my", get(my_favorites))
        .route("/projects/{id}", get(get_project).put(update_project).delete(delete_project))
        .route("/projects/{id}/like", post(like_project))
        .route("/projects/{id}/favorite", post(favorite_project))
        .route("/projects/{id}/rate", post(rate_project))
        .route("/projects/{id}/comments", get(list_comments).post(post_comment))
        .route("/projects/{id}/comments/{comment_id}", delete(delete_comment))
        .with_state(state)
}

/// Start the HTTP server bound to the given port with the given data root and
/// identity verifier.
pub async fn run_with_ports(http_port: u16, db_root: &str, verifier: SharedVerifier) -> anyhow::Result<()> {
    let store = SharedStore::new(db_root)?;
    let state = AppState { store, verifier };

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Convenience entry point reading `VITRINE_HTTP_PORT` (default 7878) and
/// `VITRINE_DB_FOLDER` (default "dbs"). `VITRINE_DEV_TOKEN=token:subject:email`
/// pre-registers one credential in the in-process verifier for local use.
pub async fn run() -> anyhow::Result<()> {
    let http_port = std::env::var("VITRINE_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(7878);
    let db_root = std::env::var("VITRINE_DB_FOLDER").unwrap_or_else(|_| "dbs".to_string());

    let directory = TokenDirectory::new();
    if let Ok(raw) = std::env::var("VITRINE_DEV_TOKEN") {
        let parts: Vec<&str> = raw.splitn(3, ':').collect();
        if let [token, subject, email] = parts.as_slice() {
            directory.register(token, subject, email);
            info!("registered dev credential for subject '{}'", subject);
        } else {
            error!("VITRINE_DEV_TOKEN must be 'token:subject:email'; ignoring");
        }
    }

    run_with_ports(http_port, &db_root, Arc::new(directory)).await
}
