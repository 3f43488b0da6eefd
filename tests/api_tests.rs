//! Integration tests for the HTTP endpoints
//!
//! The router runs against a keyword-driven engine so results are
//! deterministic without model weights.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use complaint_triage::{build_router, AppState};
use serde_json::{json, Value};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

mod common;

use common::{body_bytes, upload_request, FailingEngine, KeywordEngine, BOUNDARY};

fn setup_app() -> axum::Router {
    build_router(AppState::new(Arc::new(KeywordEngine)))
}

fn predict_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

/// Read every entry of the returned archive, in archive order.
async fn extract_archive(body: Body) -> Vec<(String, Value)> {
    let bytes = body_bytes(body).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("Should be a zip");
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut contents = String::new();
            entry.read_to_string(&mut contents).unwrap();
            (
                entry.name().to_string(),
                serde_json::from_str(&contents).unwrap(),
            )
        })
        .collect()
}

async fn assert_error(response: axum::response::Response, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], code, "unexpected body: {body}");
    assert!(body["error"]["message"].is_string());
}

// =============================================================================
// Health and static routes
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let response = setup_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_index_served_from_static_dir() {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        static_dir.path().join("index.html"),
        "<html><body>triage</body></html>",
    )
    .unwrap();
    std::fs::write(static_dir.path().join("app.js"), "console.log('ok');").unwrap();

    let app = build_router(AppState::new(Arc::new(KeywordEngine)).with_static_dir(static_dir.path()));

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(html.contains("triage"));

    let response = app
        .oneshot(Request::get("/static/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// POST /predict
// =============================================================================

#[tokio::test]
async fn test_predict_positive_is_low_priority() {
    let response = setup_app()
        .oneshot(predict_request(json!({"text": "Great service"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sentiment"], "positive");
    assert_eq!(body["confidence"], 0.99);
    assert_eq!(body["priority"], "low");
}

#[tokio::test]
async fn test_predict_confident_negative_is_high_priority() {
    let response = setup_app()
        .oneshot(predict_request(json!({"text": "My order arrived broken"})))
        .await
        .unwrap();

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sentiment"], "negative");
    assert_eq!(body["priority"], "high");
}

#[tokio::test]
async fn test_predict_rejects_blank_text() {
    let response = setup_app()
        .oneshot(predict_request(json!({"text": "   \n\t"})))
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "EmptyText").await;
}

#[tokio::test]
async fn test_predict_engine_failure_is_server_error() {
    let app = build_router(AppState::new(Arc::new(FailingEngine)));
    let response = app
        .oneshot(predict_request(json!({"text": "hello"})))
        .await
        .unwrap();

    assert_error(response, StatusCode::INTERNAL_SERVER_ERROR, "InferenceFailed").await;
}

// =============================================================================
// POST /analyze-complaints
// =============================================================================

#[tokio::test]
async fn test_empty_list_is_empty_input() {
    let response = setup_app()
        .oneshot(upload_request("complaints.json", b"[]"))
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "EmptyInput").await;
}

#[tokio::test]
async fn test_too_many_records_is_too_large() {
    let records: Vec<Value> = (0..20_001)
        .map(|i| json!({"id": i, "message": "fine"}))
        .collect();
    let payload = serde_json::to_vec(&records).unwrap();

    let response = setup_app()
        .oneshot(upload_request("complaints.json", &payload))
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "TooLarge").await;
}

#[tokio::test]
async fn test_csv_text_column_is_renamed_to_message() {
    let response = setup_app()
        .oneshot(upload_request(
            "complaints.csv",
            b"id,text\n1,\"Terrible service\"\n",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/zip"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"sorted_complaints.zip\""
    );

    let entries = extract_archive(response.into_body()).await;
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "high_priority_complaints.json",
            "low_priority_complaints.json",
            "summary.json"
        ]
    );

    let high = entries[0].1.as_array().unwrap();
    let low = entries[1].1.as_array().unwrap();
    assert_eq!(high.len() + low.len(), 1);
    assert_eq!(high[0]["message"], "Terrible service");
    assert_eq!(high[0]["id"], 1);
    assert_eq!(
        entries[2].1,
        json!({"total_complaints": 1, "high_priority": 1, "low_priority": 0})
    );
}

#[tokio::test]
async fn test_csv_short_rows_are_kept() {
    let response = setup_app()
        .oneshot(upload_request(
            "complaints.csv",
            b"id,message,channel\n1,broken\n2,late,email\n",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let entries = extract_archive(response.into_body()).await;
    assert_eq!(entries[0].1[0]["id"], 1);
    assert_eq!(entries[1].1[0]["id"], 2);
    assert_eq!(entries[2].1["total_complaints"], 2);
}

#[tokio::test]
async fn test_blank_messages_are_no_valid_messages() {
    let response = setup_app()
        .oneshot(upload_request("complaints.json", br#"[{"message": "   "}]"#))
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "NoValidMessages").await;
}

#[tokio::test]
async fn test_positive_record_lands_in_low_priority() {
    let response = setup_app()
        .oneshot(upload_request(
            "complaints.json",
            br#"[{"id": 5, "message": "ok"}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let entries = extract_archive(response.into_body()).await;

    assert_eq!(entries[0].1, json!([]));
    assert_eq!(
        entries[1].1,
        json!([{
            "id": 5,
            "message": "ok",
            "sentiment": "positive",
            "confidence": 0.99,
            "priority": "low"
        }])
    );
}

#[tokio::test]
async fn test_partitions_keep_input_order_and_drop_invalid_records() {
    let payload = json!([
        {"id": "a", "message": "terrible wait"},
        {"id": "b", "message": "thanks"},
        {"id": "c", "message": ""},
        {"id": "d", "message": "meh"},
        {"id": "e", "message": 42},
        {"id": "f", "message": "  broken screen  "},
        {"message": "no id here"}
    ]);

    let response = setup_app()
        .oneshot(upload_request(
            "complaints.json",
            payload.to_string().as_bytes(),
        ))
        .await
        .unwrap();

    let entries = extract_archive(response.into_body()).await;
    let ids = |index: usize| -> Vec<Value> {
        entries[index]
            .1
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].clone())
            .collect()
    };

    assert_eq!(ids(0), vec![json!("a"), json!("f")]);
    assert_eq!(ids(1), vec![json!("b"), json!("d"), Value::Null]);
    assert_eq!(entries[0].1[1]["message"], "broken screen");
    assert_eq!(
        entries[2].1,
        json!({"total_complaints": 5, "high_priority": 2, "low_priority": 3})
    );
}

#[tokio::test]
async fn test_long_messages_are_truncated() {
    let message = "x".repeat(600);
    let payload = json!([{"id": 1, "message": message}]);

    let response = setup_app()
        .oneshot(upload_request(
            "complaints.json",
            payload.to_string().as_bytes(),
        ))
        .await
        .unwrap();

    let entries = extract_archive(response.into_body()).await;
    let stored = entries[1].1[0]["message"].as_str().unwrap();
    assert_eq!(stored.chars().count(), 500);
}

#[tokio::test]
async fn test_unsupported_extension() {
    let response = setup_app()
        .oneshot(upload_request("complaints.txt", b"hello"))
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "UnsupportedFormat").await;
}

#[tokio::test]
async fn test_malformed_json_and_schema() {
    let response = setup_app()
        .oneshot(upload_request("complaints.json", b"[{\"message\":"))
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "InvalidJSON").await;

    let response = setup_app()
        .oneshot(upload_request("complaints.json", br#"{"message": "hi"}"#))
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "InvalidSchema").await;
}

#[tokio::test]
async fn test_csv_without_text_column() {
    let response = setup_app()
        .oneshot(upload_request("complaints.csv", b"id,rating\n1,5\n"))
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "MissingTextColumn").await;
}

#[tokio::test]
async fn test_missing_file_field() {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"note\"\r\n\r\n\
         not a file\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-complaints")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = setup_app().oneshot(request).await.unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "MissingFile").await;
}

#[tokio::test]
async fn test_upload_over_body_limit_is_rejected() {
    let app = build_router(AppState::new(Arc::new(KeywordEngine)).with_max_upload_bytes(256));
    let payload = serde_json::to_vec(&json!([{"message": "x".repeat(1024)}])).unwrap();

    let response = app
        .oneshot(upload_request("complaints.json", &payload))
        .await
        .unwrap();

    assert_error(response, StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge").await;
}

#[tokio::test]
async fn test_bulk_engine_failure_is_server_error() {
    let app = build_router(AppState::new(Arc::new(FailingEngine)));
    let response = app
        .oneshot(upload_request("complaints.json", br#"[{"message": "hi"}]"#))
        .await
        .unwrap();

    assert_error(response, StatusCode::INTERNAL_SERVER_ERROR, "InferenceFailed").await;
}
