//! Performance insight model - aggregated trends and recommendations.

use serde::{Deserialize, Serialize};

use crate::id::EmployeeId;
use crate::quality::QualityScore;
use crate::Time;

/// Coarse direction of the completion rate over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Last completion rate is strictly higher than the first
    Improving,
    /// Anything else, including a flat or empty history
    Declining,
}

impl TrendDirection {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a task name was reported as completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFrequency {
    /// Task name
    pub task: String,
    /// Number of times it was reported
    pub count: usize,
}

/// Trend statistics for one employee over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Mean completion rate of the records that were processed
    pub completion_rate_trend: f64,

    /// Quality scores in chronological record order
    pub quality_trend: Vec<QualityScore>,

    /// First vs last completion rate
    pub trend_direction: TrendDirection,

    /// Up to five most frequently completed tasks
    pub common_tasks: Vec<TaskFrequency>,
}

impl Default for TrendSummary {
    fn default() -> Self {
        Self {
            completion_rate_trend: 0.0,
            quality_trend: Vec::new(),
            trend_direction: TrendDirection::Declining,
            common_tasks: Vec::new(),
        }
    }
}

/// Area a recommendation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationArea {
    /// Completion rate below target
    TaskCompletion,
    /// Weak update quality
    ResponseQuality,
    /// Narrow range of tasks
    TaskVariety,
}

impl RecommendationArea {
    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RecommendationArea::TaskCompletion => "Task Completion",
            RecommendationArea::ResponseQuality => "Response Quality",
            RecommendationArea::TaskVariety => "Task Variety",
        }
    }
}

/// One actionable recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Area addressed
    pub area: RecommendationArea,
    /// What was observed
    pub observation: String,
    /// What to do about it
    pub suggestion: String,
}

impl Recommendation {
    /// Create a recommendation.
    pub fn new(
        area: RecommendationArea,
        observation: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            area,
            observation: observation.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// The persisted bundle produced by one insight run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    /// Employee the insight is about
    pub employee_id: EmployeeId,

    /// Aggregated trend
    pub trend_summary: TrendSummary,

    /// Recommendations, in rule order
    pub recommendations: Vec<Recommendation>,

    /// Clock value the run was started with
    pub generated_at: Time,
}

impl InsightResult {
    /// Completion rate trend expressed as a rounded percentage.
    pub fn completion_percentage(&self) -> f64 {
        (self.trend_summary.completion_rate_trend * 1000.0).round() / 10.0
    }
}
