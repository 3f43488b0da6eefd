//! Inference pipelines.
//!
//! A pipeline pairs a loaded model with its tokenizer. The bulk orchestrator
//! and HTTP handlers never see a pipeline directly; they depend on the
//! [`InferenceEngine`] trait so a deterministic double can stand in for the
//! real classifier.

pub mod sentiment_analysis_pipeline;
pub mod utils;

pub use sentiment_analysis_pipeline::{InferenceResult, Sentiment};

/// Batched complaint classification.
///
/// Implementations return exactly one result per input, in input order.
pub trait InferenceEngine: Send + Sync {
    fn predict_batch(&self, texts: &[String]) -> anyhow::Result<Vec<InferenceResult>>;

    fn predict(&self, text: &str) -> anyhow::Result<InferenceResult> {
        self.predict_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("inference engine returned no result"))
    }
}
