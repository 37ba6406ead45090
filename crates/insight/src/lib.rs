//! Performance insights (Layer 3)
//!
//! Compares planned and completed work, aggregates trends over a window,
//! derives recommendations and persists the result.

#![warn(missing_docs)]

pub mod comparator;
pub mod pipeline;
pub mod recommend;
pub mod trend;

pub use comparator::{compare, compare_record, ON_TRACK_RATIO};
pub use pipeline::{InsightError, InsightOutcome, InsightPipeline, PersistenceError, PipelineConfig};
pub use recommend::{
    CompletionRateRule, QualityRule, RecommendationEngine, RecommendationInput, RecommendationRule,
    RuleError, TaskVarietyRule,
};
pub use trend::{aggregate, Aggregation, TaskPatterns, COMMON_TASK_LIMIT};
