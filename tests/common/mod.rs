// Common test utilities

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
};
use complaint_triage::pipelines::{InferenceEngine, InferenceResult, Sentiment};

pub const BOUNDARY: &str = "complaint-triage-test-boundary";

/// Negative at 0.95 for texts mentioning "terrible" or "broken", negative
/// at 0.5 for "meh", positive at 0.99 otherwise.
pub struct KeywordEngine;

impl InferenceEngine for KeywordEngine {
    fn predict_batch(&self, texts: &[String]) -> anyhow::Result<Vec<InferenceResult>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                if lower.contains("terrible") || lower.contains("broken") {
                    InferenceResult::new(Sentiment::Negative, 0.95)
                } else if lower.contains("meh") {
                    InferenceResult::new(Sentiment::Negative, 0.5)
                } else {
                    InferenceResult::new(Sentiment::Positive, 0.99)
                }
            })
            .collect())
    }
}

pub struct FailingEngine;

impl InferenceEngine for FailingEngine {
    fn predict_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<InferenceResult>> {
        anyhow::bail!("device lost")
    }
}

/// Multipart POST to /analyze-complaints with a single file field.
pub fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/analyze-complaints")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}
