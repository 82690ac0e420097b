use super::*;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct MockState {
    auth_headers: Arc<Mutex<Vec<String>>>,
    assign_bodies: Arc<Mutex<Vec<AssignmentRequest>>>,
}

async fn record_auth(state: &MockState, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.auth_headers.lock().await.push(value);
}

async fn mock_forest(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    record_auth(&state, &headers).await;
    Json(json!({
        "success": true,
        "tree": [{
            "id": 1,
            "name": "Avery",
            "title": "CEO",
            "team_size": 1,
            "children": [{ "id": 2, "name": "Blake", "title": "CTO" }]
        }]
    }))
}

async fn mock_roster(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    record_auth(&state, &headers).await;
    Json(json!({ "success": false, "error": "roster unavailable" }))
}

async fn mock_subtree(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> (StatusCode, Json<Value>) {
    record_auth(&state, &headers).await;
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Employee not found" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "tree": { "id": id, "name": "Casey", "team_size": 0, "children": [] },
            "parent": { "id": 1, "name": "Avery", "title": "CEO" },
            "debug": { "direct_reports": 0, "total_reports": 0, "depth": 1 }
        })),
    )
}

async fn mock_assign(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<AssignmentRequest>,
) -> Json<Value> {
    record_auth(&state, &headers).await;
    state.assign_bodies.lock().await.push(body);
    Json(json!({ "success": true, "message": "assigned" }))
}

async fn mock_unassign() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_mock_backend() -> anyhow::Result<(String, MockState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::default();
    let app = Router::new()
        .route(TREE_ROUTE, get(mock_forest))
        .route(ROSTER_ROUTE, get(mock_roster))
        .route("/api/employee-tree/employee/:id", get(mock_subtree))
        .route(ASSIGN_ROUTE, post(mock_assign))
        .route(UNASSIGN_ROUTE, post(mock_unassign))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[tokio::test]
async fn fetch_forest_sends_bearer_token_and_parses_nodes() {
    let (url, state) = spawn_mock_backend().await.expect("spawn server");
    let backend = HttpBackend::new(&url, Some("tok-123".into())).expect("backend");

    let forest = backend.fetch_forest().await.expect("forest");
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].children[0].id, EmployeeId(2));
    assert_eq!(forest[0].team_size, 1);

    let headers = state.auth_headers.lock().await;
    assert_eq!(headers.as_slice(), ["Bearer tok-123".to_string()]);
}

#[tokio::test]
async fn success_false_becomes_backend_rejection_with_server_message() {
    let (url, _state) = spawn_mock_backend().await.expect("spawn server");
    let backend = HttpBackend::new(&url, None).expect("backend");

    let err = backend.fetch_roster().await.expect_err("must fail");
    let rejection = err
        .downcast_ref::<BackendRejection>()
        .expect("backend rejection");
    assert_eq!(rejection.status, 200);
    assert_eq!(rejection.message, "roster unavailable");
}

#[tokio::test]
async fn non_2xx_keeps_error_text_from_body() {
    let (url, _state) = spawn_mock_backend().await.expect("spawn server");
    let backend = HttpBackend::new(&url, None).expect("backend");

    let err = backend
        .fetch_subtree(EmployeeId(404))
        .await
        .expect_err("must fail");
    let rejection = err
        .downcast_ref::<BackendRejection>()
        .expect("backend rejection");
    assert_eq!(rejection.status, 404);
    assert_eq!(rejection.message, "Employee not found");
}

#[tokio::test]
async fn non_2xx_without_body_falls_back_to_status_text() {
    let (url, _state) = spawn_mock_backend().await.expect("spawn server");
    let backend = HttpBackend::new(&url, None).expect("backend");

    let err = backend
        .unassign(EmployeeId(1), &[EmployeeId(2)])
        .await
        .expect_err("must fail");
    let rejection = err
        .downcast_ref::<BackendRejection>()
        .expect("backend rejection");
    assert_eq!(rejection.status, 500);
    assert!(rejection.message.contains("500"));
}

#[tokio::test]
async fn subtree_includes_parent_and_debug() {
    let (url, _state) = spawn_mock_backend().await.expect("spawn server");
    let backend = HttpBackend::new(&url, None).expect("backend");

    let response = backend.fetch_subtree(EmployeeId(3)).await.expect("subtree");
    assert_eq!(response.tree.expect("tree").id, EmployeeId(3));
    assert_eq!(response.parent.expect("parent").id, EmployeeId(1));
    assert_eq!(response.debug.expect("debug").depth, 1);
}

#[tokio::test]
async fn assign_posts_manager_and_employee_ids() {
    let (url, state) = spawn_mock_backend().await.expect("spawn server");
    let backend = HttpBackend::new(&format!("{url}/"), Some("t".into())).expect("backend");

    backend
        .assign(EmployeeId(1), &[EmployeeId(5), EmployeeId(6)])
        .await
        .expect("assign");

    let bodies = state.assign_bodies.lock().await;
    assert_eq!(
        bodies.as_slice(),
        [AssignmentRequest {
            manager_id: EmployeeId(1),
            employee_ids: vec![EmployeeId(5), EmployeeId(6)],
        }]
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_plain_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let backend = HttpBackend::new(&format!("http://{addr}"), None).expect("backend");
    let err = backend.fetch_forest().await.expect_err("must fail");
    assert!(err.downcast_ref::<BackendRejection>().is_none());
}
