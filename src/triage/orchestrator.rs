use super::ingest::{ingest, CleanedComplaint};
use super::package::{package, Bundle};
use super::priority::Priority;
use crate::core::{IngestError, Limits};
use crate::pipelines::{InferenceEngine, InferenceResult, Sentiment};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A cleaned complaint with its classification. Field order is the
/// serialized order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedComplaint {
    pub id: Value,
    pub message: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub priority: Priority,
}

impl EnrichedComplaint {
    fn new(complaint: CleanedComplaint, result: InferenceResult) -> Self {
        Self {
            id: complaint.id(),
            message: complaint.message,
            sentiment: result.sentiment,
            confidence: result.confidence,
            priority: result.priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_complaints: usize,
    pub high_priority: usize,
    pub low_priority: usize,
}

/// Complaints split by priority, each list in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageReport {
    pub high_priority: Vec<EnrichedComplaint>,
    pub low_priority: Vec<EnrichedComplaint>,
    pub summary: Summary,
}

impl TriageReport {
    /// Zip complaints with their results and split them by priority.
    pub fn partition(
        complaints: Vec<CleanedComplaint>,
        results: Vec<InferenceResult>,
    ) -> anyhow::Result<Self> {
        if complaints.len() != results.len() {
            anyhow::bail!(
                "inference returned {} results for {} complaints",
                results.len(),
                complaints.len()
            );
        }

        let (high_priority, low_priority): (Vec<_>, Vec<_>) = complaints
            .into_iter()
            .zip(results)
            .map(|(complaint, result)| EnrichedComplaint::new(complaint, result))
            .partition(|enriched| enriched.priority == Priority::High);

        let summary = Summary {
            total_complaints: high_priority.len() + low_priority.len(),
            high_priority: high_priority.len(),
            low_priority: low_priority.len(),
        };

        Ok(Self {
            high_priority,
            low_priority,
            summary,
        })
    }
}

/// Classify all complaints with a single batched engine call.
pub fn analyze(
    engine: &dyn InferenceEngine,
    complaints: Vec<CleanedComplaint>,
) -> anyhow::Result<TriageReport> {
    let messages: Vec<String> = complaints.iter().map(|c| c.message.clone()).collect();
    let results = engine.predict_batch(&messages)?;
    let report = TriageReport::partition(complaints, results)?;

    tracing::info!(
        total = report.summary.total_complaints,
        high = report.summary.high_priority,
        low = report.summary.low_priority,
        "partitioned complaints"
    );
    Ok(report)
}

/// Failure of a bulk request, by the stage that failed.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    #[error("failed to package results: {0}")]
    Packaging(#[source] anyhow::Error),
}

/// Run an upload end to end: ingest, classify, partition, package.
///
/// Validation failures return before the engine is called or anything is
/// written to disk. The returned [`Bundle`] owns the scratch directory.
pub fn process_upload(
    engine: &dyn InferenceEngine,
    filename: &str,
    bytes: &[u8],
    limits: &Limits,
) -> Result<Bundle, BulkError> {
    let complaints = ingest(filename, bytes, limits)?;
    let report = analyze(engine, complaints).map_err(BulkError::Inference)?;
    package(&report).map_err(BulkError::Packaging)
}
