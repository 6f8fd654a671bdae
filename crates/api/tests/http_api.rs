//! End-to-end tests for the HTTP surface, driving the full router (with
//! its middleware stack) against a scripted mock provider.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{get_json, post_json, test_app, MockProvider};

/// Create a session and return its id.
async fn create_session(app: &axum::Router) -> String {
    let (status, body) = post_json(app, "/api/v1/sessions", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["session_id"].as_str().unwrap().to_string()
}

/// Seed a session with one subject and return the subject id.
async fn seed_subject(app: &axum::Router, session_id: &str) -> String {
    let (status, body) = post_json(
        app,
        &format!("/api/v1/sessions/{session_id}/updates"),
        json!({
            "updates": [
                {"subject": {"name": "Avery", "description": "red jacket, silver scarf", "confidence": 0.9}}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["subjects"][0]["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Test: health endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let app = test_app(MockProvider::default());
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ---------------------------------------------------------------------------
// Test: session lifecycle and extraction updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_session_returns_an_id() {
    let app = test_app(MockProvider::default());
    let session_id = create_session(&app).await;

    let (status, body) = get_json(&app, &format!("/api/v1/sessions/{session_id}/consistency")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["session_id"], session_id);
    assert!(body["data"]["subjects"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = test_app(MockProvider::default());
    let (status, body) = get_json(
        &app,
        "/api/v1/sessions/00000000-0000-0000-0000-000000000000/consistency",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn updates_mutate_consistency_state_with_last_write_wins() {
    let app = test_app(MockProvider::default());
    let session_id = create_session(&app).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/updates"),
        json!({
            "updates": [
                {"subject": {"name": "Avery", "description": "red jacket", "confidence": 0.9}},
                {"environment": {"description": "rooftop at dusk"}},
                {"style": {"description": "warm cinematic grade"}}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let first_id = body["data"]["subjects"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["subjects"][0]["name"], "Avery");
    assert_eq!(body["data"]["environment"]["description"], "rooftop at dusk");
    assert_eq!(body["data"]["style"]["description"], "warm cinematic grade");

    // A later subject update overwrites only the fields it carries and
    // keeps the id stable.
    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/updates"),
        json!({
            "updates": [
                {"subject": {"name": "avery", "description": "green coat"}}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let subjects = body["data"]["subjects"].as_array().unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0]["id"], first_id.as_str());
    assert_eq!(subjects[0]["description"], "green coat");
    assert_eq!(subjects[0]["confidence"], 0.9);
}

#[tokio::test]
async fn out_of_range_confidence_is_a_validation_error() {
    let app = test_app(MockProvider::default());
    let session_id = create_session(&app).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/updates"),
        json!({"updates": [{"subject": {"name": "Avery", "confidence": 1.5}}]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: reference image flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reference_flow_with_synchronous_provider() {
    let app = test_app(
        MockProvider::default().with_completed_submission("https://cdn.example/ref.png"),
    );
    let session_id = create_session(&app).await;
    let subject_id = seed_subject(&app, &session_id).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/subjects/{subject_id}/reference"),
        json!({"pose": "front-facing, neutral expression"}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["status"], "succeeded");
    assert_eq!(body["data"]["result_url"], "https://cdn.example/ref.png");

    // The URL was written back onto the subject sheet.
    let (_, body) = get_json(&app, &format!("/api/v1/sessions/{session_id}/consistency")).await;
    assert_eq!(
        body["data"]["subjects"][0]["reference_image_url"],
        "https://cdn.example/ref.png"
    );
}

#[tokio::test]
async fn reference_flow_with_asynchronous_provider() {
    let app = test_app(
        MockProvider::default()
            .with_accepted("ref-1")
            .with_completed_status("https://cdn.example/ref.png"),
    );
    let session_id = create_session(&app).await;
    let subject_id = seed_subject(&app, &session_id).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/subjects/{subject_id}/reference"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["status"], "running");
    assert!(body["data"]["result_url"].is_null());

    let (status, body) = get_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/reference-tasks/ref-1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "succeeded");

    let (_, body) = get_json(&app, &format!("/api/v1/sessions/{session_id}/consistency")).await;
    assert_eq!(
        body["data"]["subjects"][0]["reference_image_url"],
        "https://cdn.example/ref.png"
    );
}

#[tokio::test]
async fn reference_request_for_unknown_subject_is_not_found() {
    let app = test_app(MockProvider::default());
    let session_id = create_session(&app).await;

    let (status, body) = post_json(
        &app,
        &format!(
            "/api/v1/sessions/{session_id}/subjects/00000000-0000-0000-0000-000000000000/reference"
        ),
        json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: video generation and task lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_video_then_poll_cancel_and_conflict_on_second_cancel() {
    let app = test_app(
        MockProvider::default()
            .with_accepted("vid-1")
            .with_running_status(),
    );
    let session_id = create_session(&app).await;
    let subject_id = seed_subject(&app, &session_id).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/generate-video"),
        json!({"subject_ids": [subject_id]}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["task_id"], "vid-1");
    assert_eq!(body["data"]["status"], "running");

    let (status, body) = get_json(&app, "/api/v1/tasks/vid-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "running");

    let (status, body) = post_json(&app, "/api/v1/tasks/vid-1/cancel", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "canceled");

    let (status, body) = post_json(&app, "/api/v1/tasks/vid-1/cancel", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TERMINAL_TASK");
}

#[tokio::test]
async fn completed_video_serves_its_artifact_url() {
    let app = test_app(
        MockProvider::default()
            .with_accepted("vid-1")
            .with_completed_status("https://cdn.example/out.mp4"),
    );
    let session_id = create_session(&app).await;
    let subject_id = seed_subject(&app, &session_id).await;

    post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/generate-video"),
        json!({"subject_ids": [subject_id]}),
    )
    .await;

    let (_, body) = get_json(&app, "/api/v1/tasks/vid-1").await;
    assert_eq!(body["data"]["status"], "succeeded");

    let (status, body) = get_json(&app, "/api/v1/tasks/vid-1/artifact").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result_url"], "https://cdn.example/out.mp4");

    // The registry snapshot lists the task for debugging.
    let (status, body) = get_json(&app, "/api/v1/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["task_id"], "vid-1");
}

#[tokio::test]
async fn generate_video_with_no_known_subjects_is_a_validation_error() {
    let app = test_app(MockProvider::default());
    let session_id = create_session(&app).await;

    // An unknown subject id assembles an empty prompt, which submission
    // rejects before any provider contact.
    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/generate-video"),
        json!({"subject_ids": ["00000000-0000-0000-0000-000000000000"]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn generate_video_with_empty_subject_list_is_a_bad_request() {
    let app = test_app(MockProvider::default());
    let session_id = create_session(&app).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/v1/sessions/{session_id}/generate-video"),
        json!({"subject_ids": []}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn polling_an_unknown_task_is_not_found() {
    let app = test_app(MockProvider::default());
    let (status, body) = get_json(&app, "/api/v1/tasks/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
