use std::{fs, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::EmployeeId,
    error::{ApiError, ErrorCode},
    protocol::{
        AssignmentRequest, ForestResponse, MutationResponse, RosterResponse, SubtreeResponse,
        ASSIGN_ROUTE, ROSTER_ROUTE, TREE_ROUTE, UNASSIGN_ROUTE,
    },
};
use tokio::sync::RwLock;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

mod config;
mod directory;

use config::{load_settings, Settings};
use directory::{Directory, DirectoryError};

const DEMO_SEED: &str = include_str!("../seed/demo.json");
const MAX_BODY_BYTES: usize = 64 * 1024;

struct AppState {
    directory: RwLock<Directory>,
    token: Option<String>,
}

type ApiFailure = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let directory = load_directory(&settings)?;
    info!(
        employees = directory.len(),
        auth = settings.token.is_some(),
        "directory loaded"
    );

    let state = AppState {
        directory: RwLock::new(directory),
        token: settings.token.clone(),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "org chart server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn load_directory(settings: &Settings) -> anyhow::Result<Directory> {
    match &settings.seed_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read seed '{}'", path.display()))?;
            Directory::from_json(&raw)
                .with_context(|| format!("failed to load seed '{}'", path.display()))
        }
        None => Directory::from_json(DEMO_SEED).context("bundled demo seed is invalid"),
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(TREE_ROUTE, get(http_forest))
        .route(ROSTER_ROUTE, get(http_roster))
        .route("/api/employee-tree/employee/:employee_id", get(http_subtree))
        .route(ASSIGN_ROUTE, post(http_assign))
        .route(UNASSIGN_ROUTE, post(http_unassign))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn failure(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> ApiFailure {
    (status, Json(ApiError::new(code, message)))
}

fn directory_failure(err: DirectoryError) -> ApiFailure {
    let code = err.code();
    let status = match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(status, code, err.to_string())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let Some(expected) = &state.token else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    if presented == Some(expected.as_str()) {
        Ok(())
    } else {
        warn!("rejected request with missing or invalid bearer token");
        Err(failure(
            StatusCode::UNAUTHORIZED,
            ErrorCode::Unauthorized,
            "Unauthorized",
        ))
    }
}

async fn http_forest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ForestResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let tree = state.directory.read().await.forest();
    Ok(Json(ForestResponse {
        success: true,
        tree,
        error: None,
    }))
}

async fn http_roster(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RosterResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let employees = state.directory.read().await.roster();
    Ok(Json(RosterResponse {
        success: true,
        employees,
        error: None,
    }))
}

async fn http_subtree(
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SubtreeResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let (tree, parent, debug) = state
        .directory
        .read()
        .await
        .subtree(EmployeeId(employee_id))
        .map_err(directory_failure)?;
    Ok(Json(SubtreeResponse {
        success: true,
        tree: Some(tree),
        parent,
        debug: Some(debug),
        error: None,
    }))
}

async fn http_assign(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AssignmentRequest>,
) -> Result<Json<MutationResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let assigned = state
        .directory
        .write()
        .await
        .assign(req.manager_id, &req.employee_ids)
        .map_err(|err| {
            warn!(manager_id = req.manager_id.0, error = %err, "assign refused");
            directory_failure(err)
        })?;
    info!(manager_id = req.manager_id.0, assigned, "employees assigned");
    Ok(Json(MutationResponse::ok(format!(
        "Assigned {assigned} employee(s)"
    ))))
}

async fn http_unassign(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AssignmentRequest>,
) -> Result<Json<MutationResponse>, ApiFailure> {
    authorize(&state, &headers)?;
    let removed = state
        .directory
        .write()
        .await
        .unassign(req.manager_id, &req.employee_ids)
        .map_err(|err| {
            warn!(manager_id = req.manager_id.0, error = %err, "unassign refused");
            directory_failure(err)
        })?;
    info!(manager_id = req.manager_id.0, removed, "employees unassigned");
    Ok(Json(MutationResponse::ok(format!(
        "Unassigned {removed} employee(s)"
    ))))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/end_to_end_tests.rs"]
mod end_to_end_tests;
