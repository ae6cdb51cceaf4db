use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use serde_json::{Value, json};
use tower::ServiceExt;

use studyboard::api::router;
use studyboard::db::connect_in_memory;
use studyboard::generator::NoopTaskGenerator;
use studyboard::remote::LocalStore;
use studyboard::state::AppState;

async fn setup_app() -> Router {
    let pool = connect_in_memory().await.expect("Failed to create test db");
    let store = Arc::new(LocalStore::new(pool, Arc::new(NoopTaskGenerator)));
    router(AppState { store })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not json")
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = setup_app().await;
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_board_lifecycle() {
    let app = setup_app().await;

    let (status, board) = send(&app, "POST", "/boards", Some(json!({ "title": "Databases" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let board_id = board["id"].as_i64().unwrap();
    let todo = board["columns"][0]["id"].as_i64().unwrap();
    let done = board["columns"][2]["id"].as_i64().unwrap();
    assert_eq!(board["columns"][2]["role"], "done");

    let (status, task) = send(
        &app,
        "POST",
        &format!("/columns/{}/tasks", todo),
        Some(json!({ "title": "ER diagram", "due_date": null })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["position"], 0);
    assert_eq!(task["priority"], "Medium");
    let task_id = task["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/boards/{}/move-task", board_id),
        Some(json!({
            "taskId": task_id,
            "sourceColumnId": todo,
            "destinationColumnId": done,
            "destinationIndex": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, task) = send(
        &app,
        "PUT",
        &format!("/tasks/{}", task_id),
        Some(json!({ "completed": true, "priority": "High" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["completed"], true);
    assert_eq!(task["column_id"], done);

    let (status, board) = send(&app, "GET", &format!("/boards/{}", board_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(board["columns"][0]["tasks"].as_array().unwrap().is_empty());
    assert_eq!(board["columns"][2]["tasks"][0]["title"], "ER diagram");

    let (status, _) = send(&app, "DELETE", &format!("/boards/{}", board_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", &format!("/boards/{}", board_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn test_rejected_requests() {
    let app = setup_app().await;

    let (status, _) = send(&app, "POST", "/boards", Some(json!({ "title": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/syllabi/3/board", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/syllabi/3/board", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "A board already exists for this syllabus.");

    let (status, _) = send(&app, "DELETE", "/tasks/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/challenges",
        Some(json!({ "title": "Ghost", "end_date": "2030-01-01T00:00:00Z", "task_ids": [77] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_challenge_routes() {
    let app = setup_app().await;
    let (_, board) = send(&app, "POST", "/boards", Some(json!({ "title": "Networks" }))).await;
    let todo = board["columns"][0]["id"].as_i64().unwrap();
    let (_, task) = send(
        &app,
        "POST",
        &format!("/columns/{}/tasks", todo),
        Some(json!({ "title": "Read RFC 791", "due_date": null })),
    )
    .await;

    let (status, challenge) = send(
        &app,
        "POST",
        "/challenges",
        Some(json!({
            "title": "Protocols week",
            "end_date": "2030-01-01T00:00:00Z",
            "task_ids": [task["id"]]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = challenge["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/challenges/{}", id),
        Some(json!({ "description": "IP and TCP" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Protocols week");
    assert_eq!(updated["description"], "IP and TCP");

    let (_, list) = send(&app, "GET", "/challenges", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/challenges/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = send(&app, "GET", "/challenges", None).await;
    assert!(list.as_array().unwrap().is_empty());
}
