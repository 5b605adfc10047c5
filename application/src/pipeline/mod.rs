//! Decision pipeline services
//!
//! Propose → validate → track → collect feedback → learn. The tracker owns
//! every decision's lifecycle; the feedback processor ingests outcome
//! signals; the learning engine is a single-writer actor updating
//! per-category weights consumed by future proposals.

pub mod decide;
pub mod feedback;
pub mod learning;
pub mod tracker;

pub use decide::DecisionPipeline;
pub use feedback::FeedbackProcessor;
pub use learning::{LearningEngine, LearningHandle};
pub use tracker::{DecisionTracker, TrackerMetrics};
