//! Sentiment analysis pipeline for complaint text.
//!
//! Classifies each message as negative, neutral or positive with a
//! confidence score and derives the complaint's priority from the two.
//!
//! ## Main Types
//!
//! - [`SentimentAnalysisPipeline`] - Batched, chunked classification over a loaded model
//! - [`SentimentAnalysisPipelineBuilder`] - Builder for device, batch size and model source
//! - [`SentimentAnalysisModel`] - Trait for sentiment model implementations
//! - [`InferenceResult`] - Sentiment, rounded confidence and priority for one message
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use complaint_triage::pipelines::sentiment_analysis_pipeline::*;
//! use complaint_triage::models::ComplaintBertOptions;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let pipeline = SentimentAnalysisPipelineBuilder::complaint_bert(ComplaintBertOptions::default())
//!     .cpu()
//!     .build()
//!     .await?;
//!
//! let result = pipeline.predict("My order arrived broken and nobody answers")?;
//! println!("{} ({:.4}) -> {}", result.sentiment, result.confidence, result.priority);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod model;
pub mod pipeline;

pub use builder::SentimentAnalysisPipelineBuilder;
pub use model::SentimentAnalysisModel;
pub use pipeline::{InferenceResult, Sentiment, SentimentAnalysisPipeline};
