//! Single-message classification

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::pipelines::InferenceResult;
use crate::triage::ingest::normalize_text;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

/// POST /predict
///
/// Text gets the same trimming and truncation as bulk messages.
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<InferenceResult>> {
    let text = normalize_text(&request.text, state.limits.max_message_chars)
        .ok_or(ApiError::EmptyText)?;

    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.predict(&text))
        .await?
        .map_err(ApiError::Inference)?;

    tracing::debug!(
        sentiment = %result.sentiment,
        confidence = result.confidence,
        priority = %result.priority,
        "classified message"
    );
    Ok(Json(result))
}
