//! Feedback domain types
//!
//! Outcome signals keyed to a decision id. Feedback never mutates the
//! decision itself; it is ingested by the Feedback Processor and consumed in
//! batches by the Learning Engine.

use crate::util::{current_timestamp, new_id};
use serde::{Deserialize, Serialize};

/// An outcome signal for a tracked decision (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub decision_id: String,
    /// Observed outcome quality in [0, 1]
    pub quality: f64,
    /// How relevant the decision was to the goal, in [0, 1]
    pub relevance: f64,
    #[serde(default)]
    pub comments: String,
    /// Category of the decision this feedback refers to
    pub category: String,
    /// Milliseconds since epoch
    pub submitted_at: u64,
}

impl Feedback {
    pub fn new(decision_id: impl Into<String>, category: impl Into<String>, data: FeedbackData) -> Self {
        Self {
            id: new_id("fbk"),
            decision_id: decision_id.into(),
            quality: data.quality.clamp(0.0, 1.0),
            relevance: data.relevance.clamp(0.0, 1.0),
            comments: data.comments,
            category: category.into(),
            submitted_at: current_timestamp(),
        }
    }
}

/// Submission payload for new feedback (Value Object)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackData {
    pub quality: f64,
    pub relevance: f64,
    #[serde(default)]
    pub comments: String,
}

impl FeedbackData {
    pub fn new(quality: f64, relevance: f64) -> Self {
        Self {
            quality,
            relevance,
            comments: String::new(),
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }
}

/// Filters for feedback retrieval (Value Object)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackFilter {
    pub decision_id: Option<String>,
    pub category: Option<String>,
    pub min_quality: Option<f64>,
}

impl FeedbackFilter {
    pub fn matches(&self, feedback: &Feedback) -> bool {
        if let Some(id) = &self.decision_id
            && &feedback.decision_id != id
        {
            return false;
        }
        if let Some(category) = &self.category
            && &feedback.category != category
        {
            return false;
        }
        if let Some(min) = self.min_quality
            && feedback.quality < min
        {
            return false;
        }
        true
    }
}

/// Per-category aggregate over received feedback (Value Object)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: usize,
    pub mean_quality: f64,
    pub mean_relevance: f64,
}

impl CategoryStats {
    /// Fold one more observation into the running means.
    pub fn absorb(&mut self, feedback: &Feedback) {
        let n = self.count as f64;
        self.mean_quality = (self.mean_quality * n + feedback.quality) / (n + 1.0);
        self.mean_relevance = (self.mean_relevance * n + feedback.relevance) / (n + 1.0);
        self.count += 1;
    }
}
