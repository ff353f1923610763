//! HTTP-level tests for the task API router.
//!
//! Requests are driven in-process through the axum `Router`.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use task_board::api::build_router;
use task_board::db::Database;
use tower::ServiceExt;

fn setup_app() -> Router {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    build_router(Arc::new(db))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, task) = send(app, Method::POST, "/api/tasks", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    task
}

#[tokio::test]
async fn create_returns_201_with_defaults() {
    let app = setup_app();

    let task = create(
        &app,
        json!({"text": "Buy milk", "priority": "high", "category": "shopping"}),
    )
    .await;

    assert_eq!(task["text"], "Buy milk");
    assert_eq!(task["completed"], false);
    assert_eq!(task["completedAt"], Value::Null);
    assert_eq!(task["priority"], "high");
    assert_eq!(task["category"], "shopping");
    assert_eq!(task["dueDate"], Value::Null);
    assert!(task["id"].is_string());
    assert!(task["createdAt"].is_string());
}

#[tokio::test]
async fn create_accepts_legacy_task_field() {
    let app = setup_app();

    let task = create(&app, json!({"task": "Walk dog"})).await;

    assert_eq!(task["text"], "Walk dog");
    assert_eq!(task["category"], "general");
    assert_eq!(task["priority"], "medium");
}

#[tokio::test]
async fn create_validation_errors_are_400() {
    let app = setup_app();

    let (status, body) = send(&app, Method::POST, "/api/tasks", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "text is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({"text": "x", "priority": "urgent"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "priority");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({"text": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = setup_app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_applies_query_parameters() {
    let app = setup_app();
    create(&app, json!({"text": "Buy milk", "category": "shopping"})).await;
    create(&app, json!({"text": "Write report", "category": "work", "priority": "high"})).await;
    let done = create(&app, json!({"text": "Buy eggs", "category": "shopping"})).await;
    let id = done["id"].as_str().unwrap();
    send(&app, Method::PUT, &format!("/api/tasks/{}", id), Some(json!({"completed": true}))).await;

    let (status, all) = send(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert_eq!(all[0]["text"], "Buy eggs");

    let (_, found) = send(&app, Method::GET, "/api/tasks?search=BUY&completed=false", None).await;
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["text"], "Buy milk");

    let (_, high) = send(&app, Method::GET, "/api/tasks?priority=high", None).await;
    assert_eq!(high.as_array().unwrap().len(), 1);

    let (_, shopping) = send(
        &app,
        Method::GET,
        "/api/tasks?category=shopping&sortBy=createdAt&sortOrder=asc",
        None,
    )
    .await;
    let shopping = shopping.as_array().unwrap();
    assert_eq!(shopping.len(), 2);
    assert_eq!(shopping[0]["text"], "Buy milk");
}

#[tokio::test]
async fn update_toggles_completed_at() {
    let app = setup_app();
    let task = create(&app, json!({"text": "Buy milk"})).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, done) = send(&app, Method::PUT, &uri, Some(json!({"completed": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["completed"], true);
    assert!(done["completedAt"].is_string());

    let (status, reopened) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"completed": false, "completedAt": "2024-01-01T00:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["completed"], false);
    assert_eq!(reopened["completedAt"], Value::Null);
}

#[tokio::test]
async fn update_errors() {
    let app = setup_app();
    let task = create(&app, json!({"text": "x"})).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/tasks/unknown",
        Some(json!({"completed": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found: unknown");

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({"priority": "nope"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({"dueDate": "soon"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_returns_record_then_404() {
    let app = setup_app();
    let task = create(&app, json!({"text": "bye"})).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, deleted) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], task["id"]);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_single_task() {
    let app = setup_app();
    let task = create(&app, json!({"text": "find me"})).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, found) = send(&app, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, task);
}

#[tokio::test]
async fn stats_shape() {
    let app = setup_app();
    create(&app, json!({"text": "h", "priority": "high", "category": "work"})).await;
    create(&app, json!({"text": "m", "priority": "medium", "category": "work"})).await;
    create(&app, json!({"text": "l", "priority": "low", "dueDate": "2000-01-01"})).await;

    let (status, stats) = send(&app, Method::GET, "/api/tasks/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["completed"], 0);
    assert_eq!(stats["pending"], 3);
    assert_eq!(stats["byPriority"], json!({"high": 1, "medium": 1, "low": 1}));
    assert_eq!(
        stats["byCategory"],
        json!([{"_id": "work", "count": 2}, {"_id": "general", "count": 1}])
    );
    assert_eq!(stats["overdue"], 1);
}

#[tokio::test]
async fn health_endpoint() {
    let app = setup_app();

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
