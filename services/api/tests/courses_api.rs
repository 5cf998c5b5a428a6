//! Integration tests for courses, topics, notes, and uploads.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::*;
use serde_json::json;
use uuid::Uuid;

async fn create_course(app: &TestApp, token: &str, name: &str, code: &str) -> serde_json::Value {
    let (status, json) = post_json(
        app,
        "/courses",
        json!({ "name": name, "code": code }),
        Some(token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
async fn courses_are_scoped_to_the_session_user() {
    let app = test_app();
    create_course(&app, ALICE_TOKEN, "Calculus I", "MATH101").await;
    create_course(&app, BOB_TOKEN, "Organic Chemistry", "CHEM201").await;

    let (status, json) = get_json(&app, "/courses", Some(ALICE_TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    let courses = json.as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["name"], "Calculus I");
    assert_eq!(courses[0]["userId"], alice().id.to_string());
}

#[tokio::test]
async fn new_course_gets_the_default_color() {
    let app = test_app();

    let course = create_course(&app, ALICE_TOKEN, "Calculus I", "MATH101").await;
    assert_eq!(course["color"], "#10b981");
    assert_eq!(course["topics"], json!([]));

    let (status, json) = post_json(
        &app,
        "/courses",
        json!({ "name": "Physics", "code": "PHYS110", "color": "#3b82f6" }),
        Some(ALICE_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["color"], "#3b82f6");
}

#[tokio::test]
async fn course_fields_must_not_be_blank() {
    let app = test_app();

    let (status, json) = post_json(
        &app,
        "/courses",
        json!({ "name": "  ", "code": "MATH101" }),
        Some(ALICE_TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "name must not be empty");
    assert!(app.repo.courses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn topics_and_notes_nest_under_their_course() {
    let app = test_app();
    let course = create_course(&app, ALICE_TOKEN, "Calculus I", "MATH101").await;
    let course_id = course["id"].as_str().unwrap();

    let (status, topic) = post_json(
        &app,
        &format!("/courses/{}/topics", course_id),
        json!({ "name": "Limits" }),
        Some(ALICE_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let topic_id = topic["id"].as_str().unwrap();

    let (status, note) = post_json(
        &app,
        &format!("/topics/{}/notes", topic_id),
        json!({
            "title": "Squeeze theorem",
            "content": "If g <= f <= h and g, h -> L then f -> L.",
            "fileUrl": "https://storage.test/squeeze.pdf"
        }),
        Some(ALICE_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["fileUrl"], "https://storage.test/squeeze.pdf");

    let (_, courses) = get_json(&app, "/courses", Some(ALICE_TOKEN)).await;
    let topics = courses[0]["topics"].as_array().unwrap();
    assert_eq!(topics[0]["name"], "Limits");
    assert_eq!(topics[0]["notes"][0]["title"], "Squeeze theorem");
}

#[tokio::test]
async fn another_users_course_looks_missing() {
    let app = test_app();
    let course = create_course(&app, ALICE_TOKEN, "Calculus I", "MATH101").await;
    let course_id = course["id"].as_str().unwrap();

    let (status, json) = post_json(
        &app,
        &format!("/courses/{}/topics", course_id),
        json!({ "name": "Sneaky" }),
        Some(BOB_TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, _) = post_json(
        &app,
        &format!("/topics/{}/notes", Uuid::new_v4()),
        json!({ "title": "Nowhere" }),
        Some(ALICE_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_uuid_path_is_rejected() {
    let app = test_app();

    let (status, _) = post_json(
        &app,
        "/courses/not-a-uuid/topics",
        json!({ "name": "Limits" }),
        Some(ALICE_TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn multipart_request(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "teech-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            f = field,
            n = file_name,
            t = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/uploads")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::COOKIE, format!("session={}", ALICE_TOKEN))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_returns_the_public_url() {
    let app = test_app();

    let (status, _, json) = send(
        &app,
        multipart_request("file", "graph.png", "image/png", b"\x89PNG fake"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        json["url"],
        format!("https://storage.test/{}/graph.png", alice().id)
    );
    let uploads = app.storage.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].user_id, alice().id);
    assert_eq!(uploads[0].access_token, ALICE_TOKEN);
    assert_eq!(uploads[0].file_name, "graph.png");
    assert_eq!(uploads[0].content_type, "image/png");
    assert_eq!(uploads[0].len, b"\x89PNG fake".len());
}

#[tokio::test]
async fn upload_without_a_file_part_is_a_400() {
    let app = test_app();

    let (status, _, json) = send(
        &app,
        multipart_request("attachment", "graph.png", "image/png", b"data"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Multipart form must include a file");
    assert!(app.storage.uploads.lock().unwrap().is_empty());
}
