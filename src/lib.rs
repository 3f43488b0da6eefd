//! complaint-triage - customer complaint sentiment and priority service
//!
//! Classifies complaint text as negative, neutral or positive with a BERT
//! model running on Candle, derives a high/low priority, and sorts bulk
//! JSON/CSV uploads into a downloadable archive of priority buckets.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod core;
pub mod loaders;
pub mod models;
pub mod pipelines;
pub mod triage;

use crate::core::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::core::Limits;
use crate::pipelines::InferenceEngine;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded classifier, shared read-only by every request
    pub engine: Arc<dyn InferenceEngine>,
    pub limits: Limits,
    /// Directory served under /static; its index.html is served at /
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            engine,
            limits: Limits::default(),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_static_dir(mut self, static_dir: impl Into<PathBuf>) -> Self {
        self.static_dir = static_dir.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let analyze = post(api::analyze_complaints)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        .route("/predict", post(api::predict))
        .route("/analyze-complaints", analyze)
        .merge(api::health_routes())
        .route_service("/", ServeFile::new(state.static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
