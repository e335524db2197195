use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_full_quiz_flow_persists_one_submission() {
    let (app, state) = common::create_test_app().await;
    let ticket_id = common::seed_ticket(&state, "Lecture 1 Exit Ticket", ["B", "C", "A"]).await;

    // Entry point behind the shareable link
    let preview = get_json(
        &app,
        &format!("/api/v1/student/ticket?ticket_id={}", ticket_id),
        StatusCode::OK,
    )
    .await;
    assert_eq!(preview["name"], "Lecture 1 Exit Ticket");
    assert_eq!(preview["question_count"], 3);

    // Start a session
    let (status, started) = post_json(
        &app,
        "/api/v1/student/sessions",
        json!({ "ticket_id": ticket_id, "student_name": "Alex" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = started["session_id"].as_str().unwrap().to_string();
    assert_eq!(started["view"]["phase"], "answering");
    assert_eq!(started["view"]["question_number"], 1);

    // Answer B (correct), C (correct), D (incorrect), advancing after each
    for (answer, correct) in [("B", true), ("C", true), ("D", false)] {
        let (status, feedback) = post_json(
            &app,
            &format!("/api/v1/student/sessions/{}/answers", session_id),
            json!({ "answer": answer }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(feedback["phase"], "feedback");
        assert_eq!(feedback["your_answer"], answer);
        assert_eq!(feedback["correct"], correct);

        let (status, _) = post_json(
            &app,
            &format!("/api/v1/student/sessions/{}/next", session_id),
            json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // The final next landed on the completed view
    let completed = get_json(
        &app,
        &format!("/api/v1/student/sessions/{}", session_id),
        StatusCode::OK,
    )
    .await;
    assert_eq!(completed["phase"], "completed");
    assert_eq!(completed["score"], 2);
    assert_eq!(completed["question_count"], 3);
    let percent = completed["score_percent"].as_f64().unwrap();
    assert!((percent - 200.0 / 3.0).abs() < 0.01);

    // Exactly one submission landed in the store, scored 2/3
    let ticket = state.store.get_ticket(&ticket_id).await.unwrap();
    assert_eq!(ticket.submissions.len(), 1);
    let submission = &ticket.submissions[0];
    assert_eq!(submission.student_name, "Alex");
    assert_eq!(submission.score, 2);
    assert_eq!(submission.correctness.get("0"), Some(&true));
    assert_eq!(submission.correctness.get("1"), Some(&true));
    assert_eq!(submission.correctness.get("2"), Some(&false));
}

#[tokio::test]
async fn test_repeated_next_after_completion_does_not_duplicate() {
    let (app, state) = common::create_test_app().await;
    let ticket_id = common::seed_ticket(&state, "Lecture 2", ["A", "A", "A"]).await;
    let session_id = run_quiz(&app, &ticket_id, "Sam", ["A", "A", "A"]).await;

    // Hammer next a few more times; the view stays completed and the store
    // keeps a single submission
    for _ in 0..3 {
        let (status, view) = post_json(
            &app,
            &format!("/api/v1/student/sessions/{}/next", session_id),
            json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "completed");
    }

    let ticket = state.store.get_ticket(&ticket_id).await.unwrap();
    assert_eq!(ticket.submissions.len(), 1);
    assert_eq!(ticket.submissions[0].score, 3);
}

#[tokio::test]
async fn test_back_retains_answer_and_resubmission_overwrites() {
    let (app, state) = common::create_test_app().await;
    let ticket_id = common::seed_ticket(&state, "Lecture 3", ["B", "C", "A"]).await;

    let (_, started) = post_json(
        &app,
        "/api/v1/student/sessions",
        json!({ "ticket_id": ticket_id, "student_name": "Kim" }),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap().to_string();

    post_json(
        &app,
        &format!("/api/v1/student/sessions/{}/answers", session_id),
        json!({ "answer": "D" }),
    )
    .await;

    let (status, view) = post_json(
        &app,
        &format!("/api/v1/student/sessions/{}/back", session_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], "answering");
    assert_eq!(view["selected_answer"], "D");

    // Resubmitting overwrites the recorded answer
    let (_, feedback) = post_json(
        &app,
        &format!("/api/v1/student/sessions/{}/answers", session_id),
        json!({ "answer": "B" }),
    )
    .await;
    assert_eq!(feedback["your_answer"], "B");
    assert_eq!(feedback["correct"], true);
}

#[tokio::test]
async fn test_entry_point_fails_closed() {
    let (app, _state) = common::create_test_app().await;

    // Missing ticket_id parameter
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/student/ticket")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown ticket ID
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/student/ticket?ticket_id=no-such-ticket")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_on_unknown_ticket_returns_404() {
    let (app, _state) = common::create_test_app().await;

    let (status, _) = post_json(
        &app,
        "/api/v1/student/sessions",
        json!({ "ticket_id": "no-such-ticket", "student_name": "Alex" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_next_without_an_answer_conflicts() {
    let (app, state) = common::create_test_app().await;
    let ticket_id = common::seed_ticket(&state, "Lecture 4", ["A", "B", "C"]).await;

    let (_, started) = post_json(
        &app,
        "/api/v1/student/sessions",
        json!({ "ticket_id": ticket_id, "student_name": "Riley" }),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap();

    let (status, _) = post_json(
        &app,
        &format!("/api/v1/student/sessions/{}/next", session_id),
        json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_answer_label_is_rejected() {
    let (app, state) = common::create_test_app().await;
    let ticket_id = common::seed_ticket(&state, "Lecture 5", ["A", "B", "C"]).await;

    let (_, started) = post_json(
        &app,
        "/api/v1/student/sessions",
        json!({ "ticket_id": ticket_id, "student_name": "Jo" }),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap();

    let (status, _) = post_json(
        &app,
        &format!("/api/v1/student/sessions/{}/answers", session_id),
        json!({ "answer": "E" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let (app, _state) = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/student/sessions/no-such-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Drives a full quiz run and returns the session ID.
async fn run_quiz(app: &Router, ticket_id: &str, student: &str, answers: [&str; 3]) -> String {
    let (status, started) = post_json(
        app,
        "/api/v1/student/sessions",
        json!({ "ticket_id": ticket_id, "student_name": student }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = started["session_id"].as_str().unwrap().to_string();

    for answer in answers {
        post_json(
            app,
            &format!("/api/v1/student/sessions/{}/answers", session_id),
            json!({ "answer": answer }),
        )
        .await;
        post_json(
            app,
            &format!("/api/v1/student/sessions/{}/next", session_id),
            json!({}),
        )
        .await;
    }

    session_id
}

async fn get_json(app: &Router, uri: &str, expected: StatusCode) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if status != expected {
        panic!(
            "unexpected status {} body {}",
            status,
            String::from_utf8_lossy(&bytes)
        );
    }

    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}
