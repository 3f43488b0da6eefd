//! Scratch directory lifetime across a full HTTP exchange
//!
//! Kept in its own test binary with a single test: it counts directories
//! under the shared temp dir, which other upload tests would disturb.

use axum::http::StatusCode;
use complaint_triage::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

mod common;

use common::{body_bytes, upload_request, KeywordEngine};

const SCRATCH_PREFIX: &str = "complaint-triage-";

fn scratch_dirs() -> usize {
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_name().to_string_lossy().starts_with(SCRATCH_PREFIX)
                && entry.path().is_dir()
        })
        .count()
}

/// Removal runs on the blocking pool, so give it a moment.
async fn wait_for_scratch_dirs(expected: usize) -> usize {
    for _ in 0..200 {
        if scratch_dirs() == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    scratch_dirs()
}

#[tokio::test]
async fn test_scratch_dir_released_after_response() {
    let app = build_router(AppState::new(Arc::new(KeywordEngine)));
    let payload = br#"[{"id": 1, "message": "terrible"}, {"id": 2, "message": "fine"}]"#;
    let before = scratch_dirs();

    // Body fully read: released after the last chunk.
    let response = app
        .clone()
        .oneshot(upload_request("complaints.json", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(scratch_dirs(), before + 1);

    let bytes = body_bytes(response.into_body()).await;
    assert!(!bytes.is_empty());
    assert_eq!(wait_for_scratch_dirs(before).await, before);

    // Body never read: released when the response is dropped.
    let response = app
        .oneshot(upload_request("complaints.json", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(scratch_dirs(), before + 1);

    drop(response);
    assert_eq!(wait_for_scratch_dirs(before).await, before);

    // Validation failures never create a directory.
    let response = build_router(AppState::new(Arc::new(KeywordEngine)))
        .oneshot(upload_request("complaints.json", b"[]"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(scratch_dirs(), before);
}
