use super::model::SentimentAnalysisModel;
use crate::pipelines::InferenceEngine;
use crate::triage::priority::{classify_priority, Priority};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokenizers::Tokenizer;

/// Sentiment label predicted for a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Labels in classifier output order: class `i` is `ALL[i]`.
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a single message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub sentiment: Sentiment,
    /// Probability of the predicted label, rounded to 4 decimals.
    pub confidence: f64,
    pub priority: Priority,
}

impl InferenceResult {
    /// Build a result from a probability distribution over [`Sentiment::ALL`].
    ///
    /// The top label is the highest probability, ties going to the lowest
    /// class index. Priority is derived from the rounded confidence so the
    /// reported triple is always self-consistent.
    pub fn from_probabilities(probabilities: &[f32]) -> anyhow::Result<Self> {
        if probabilities.len() != Sentiment::ALL.len() {
            anyhow::bail!(
                "expected {} class probabilities, got {}",
                Sentiment::ALL.len(),
                probabilities.len()
            );
        }

        let mut best: Option<(usize, f32)> = None;
        for (index, &p) in probabilities.iter().enumerate() {
            if p.is_nan() {
                anyhow::bail!("model produced NaN probability for class {index}");
            }
            if best.map_or(true, |(_, top)| p > top) {
                best = Some((index, p));
            }
        }

        let (index, probability) =
            best.ok_or_else(|| anyhow::anyhow!("empty probability distribution"))?;
        let sentiment = Sentiment::from_index(index)
            .ok_or_else(|| anyhow::anyhow!("class index {index} has no sentiment label"))?;

        Ok(Self::new(sentiment, round_confidence(probability)))
    }

    pub fn new(sentiment: Sentiment, confidence: f64) -> Self {
        Self {
            sentiment,
            confidence,
            priority: classify_priority(sentiment, confidence),
        }
    }
}

/// Round to 4 decimal places, half away from zero.
pub fn round_confidence(probability: f32) -> f64 {
    (f64::from(probability) * 10_000.0).round() / 10_000.0
}

pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) batch_size: usize,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    pub(crate) fn new(model: M, tokenizer: Tokenizer, batch_size: usize) -> Self {
        Self {
            model,
            tokenizer,
            batch_size: batch_size.max(1),
        }
    }

    pub fn predict(&self, text: &str) -> anyhow::Result<InferenceResult> {
        let mut results = self.predict_chunk(&[text])?;
        results
            .pop()
            .ok_or_else(|| anyhow::anyhow!("model returned no prediction"))
    }

    /// Classify every text, `batch_size` texts per forward pass.
    pub fn predict_batch(&self, texts: &[String]) -> anyhow::Result<Vec<InferenceResult>> {
        let mut results = Vec::with_capacity(texts.len());
        for (chunk_index, chunk) in texts.chunks(self.batch_size).enumerate() {
            let chunk: Vec<&str> = chunk.iter().map(String::as_str).collect();
            tracing::trace!(chunk_index, size = chunk.len(), "classifying chunk");
            results.extend(self.predict_chunk(&chunk)?);
        }
        Ok(results)
    }

    fn predict_chunk(&self, texts: &[&str]) -> anyhow::Result<Vec<InferenceResult>> {
        let probabilities = self.model.predict_probabilities(&self.tokenizer, texts)?;
        if probabilities.len() != texts.len() {
            anyhow::bail!(
                "model returned {} predictions for {} texts",
                probabilities.len(),
                texts.len()
            );
        }
        probabilities
            .iter()
            .map(|row| InferenceResult::from_probabilities(row))
            .collect()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}

impl<M> InferenceEngine for SentimentAnalysisPipeline<M>
where
    M: SentimentAnalysisModel + Send + Sync,
{
    fn predict_batch(&self, texts: &[String]) -> anyhow::Result<Vec<InferenceResult>> {
        SentimentAnalysisPipeline::predict_batch(self, texts)
    }

    fn predict(&self, text: &str) -> anyhow::Result<InferenceResult> {
        SentimentAnalysisPipeline::predict(self, text)
    }
}
