use crate::pipelines::Sentiment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Negative complaints at or above this confidence are escalated.
pub const HIGH_PRIORITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// High only for confidently negative complaints; everything else is low.
pub fn classify_priority(sentiment: Sentiment, confidence: f64) -> Priority {
    match sentiment {
        Sentiment::Negative if confidence >= HIGH_PRIORITY_THRESHOLD => Priority::High,
        Sentiment::Negative | Sentiment::Neutral | Sentiment::Positive => Priority::Low,
    }
}
