//! standup core data models.
//!
//! This crate defines the records, scores and insight structures shared by
//! the storage, evaluation, insight and messaging layers.

#![warn(missing_docs)]

// Identities
mod id;

// Employees and their daily updates
mod employee;
mod record;

// Evaluation and insights
mod quality;
mod insight;

// Persistence payloads
mod feedback;
mod window;

// Re-exports
pub use id::{EmployeeId, FeedbackId, MessageLogId};

pub use employee::{Employee, EmployeeStatus};
pub use record::{split_tasks, CompletionMetrics, DailyTask, DailyTaskStatus, TaskRecord};

pub use quality::{QualityScore, QUALITY_THRESHOLD};
pub use insight::{
    InsightResult, Recommendation, RecommendationArea, TaskFrequency, TrendDirection,
    TrendSummary,
};

pub use feedback::{FeedbackReceipt, FeedbackRecord, FeedbackType, MessageDirection, MessageLog};
pub use window::{ParsePeriodError, Period, TimeWindow};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
