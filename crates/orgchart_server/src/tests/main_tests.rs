use super::*;
use axum::{
    body::{self, Body},
    http::Request,
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use shared::protocol::subtree_route;
use tower::ServiceExt;

const SEED: &str = r#"{
  "employees": [
    { "id": 1, "name": "Avery", "title": "CEO" },
    { "id": 2, "name": "Blake", "manager_id": 1 },
    { "id": 3, "name": "Casey", "manager_id": 1 },
    { "id": 4, "name": "Dana", "manager_id": 2 },
    { "id": 5, "name": "Eli" }
  ]
}"#;

fn test_app(token: Option<&str>) -> Router {
    let directory = Directory::from_json(SEED).expect("seed");
    build_router(Arc::new(AppState {
        directory: RwLock::new(directory),
        token: token.map(str::to_string),
    }))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn post_json(uri: &str, value: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let response = test_app(None)
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn forest_and_roster_routes_serve_directory() {
    let app = test_app(None);

    let response = app
        .clone()
        .oneshot(Request::get(TREE_ROUTE).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let forest: ForestResponse = read_json(response).await;
    assert!(forest.success);
    assert_eq!(forest.tree.len(), 1);
    assert_eq!(forest.tree[0].team_size, 3);

    let response = app
        .oneshot(Request::get(ROSTER_ROUTE).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let roster: RosterResponse = read_json(response).await;
    assert_eq!(roster.employees.len(), 5);
    assert_eq!(
        roster.employees[1].reporting_manager_name.as_deref(),
        Some("Avery")
    );
}

#[tokio::test]
async fn subtree_route_returns_parent_and_404_for_unknown_ids() {
    let app = test_app(None);

    let response = app
        .clone()
        .oneshot(
            Request::get(subtree_route(EmployeeId(2)))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let subtree: SubtreeResponse = read_json(response).await;
    assert_eq!(subtree.tree.map(|t| t.id), Some(EmployeeId(2)));
    assert_eq!(subtree.parent.map(|p| p.id), Some(EmployeeId(1)));
    assert_eq!(subtree.debug.map(|d| d.direct_reports), Some(1));

    let response = app
        .oneshot(
            Request::get(subtree_route(EmployeeId(42)))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ApiError = read_json(response).await;
    assert!(!error.success);
    assert_eq!(error.code, ErrorCode::NotFound);
    assert_eq!(error.error, "Employee 42 not found");
}

#[tokio::test]
async fn assign_then_forest_shows_new_report() {
    let app = test_app(None);

    let response = app
        .clone()
        .oneshot(post_json(
            ASSIGN_ROUTE,
            json!({ "manager_id": 3, "employee_ids": [5] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: MutationResponse = read_json(response).await;
    assert!(body.success);

    let response = app
        .oneshot(Request::get(TREE_ROUTE).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let forest: ForestResponse = read_json(response).await;
    let casey = forest.tree[0].find(EmployeeId(3)).expect("casey");
    assert_eq!(casey.child_ids(), vec![EmployeeId(5)]);
}

#[tokio::test]
async fn conflicting_assign_is_refused_with_message() {
    let response = test_app(None)
        .oneshot(post_json(
            ASSIGN_ROUTE,
            json!({ "manager_id": 3, "employee_ids": [4] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.error, "Dana already has a manager");
}

#[tokio::test]
async fn unassign_of_indirect_report_is_a_validation_error() {
    let response = test_app(None)
        .oneshot(post_json(
            UNASSIGN_ROUTE,
            json!({ "manager_id": 1, "employee_ids": [4] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::Validation);
}

#[tokio::test]
async fn bearer_token_is_enforced_when_configured() {
    let app = test_app(Some("s3cret"));

    let response = app
        .clone()
        .oneshot(Request::get(TREE_ROUTE).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::get(TREE_ROUTE)
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::get(TREE_ROUTE)
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let ids: Vec<i64> = (0..20_000).collect();
    let response = test_app(None)
        .oneshot(post_json(
            ASSIGN_ROUTE,
            json!({ "manager_id": 1, "employee_ids": ids }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[test]
fn default_settings_load_bundled_seed() {
    let directory = load_directory(&Settings::default()).expect("demo");
    assert!(!directory.is_empty());
}
