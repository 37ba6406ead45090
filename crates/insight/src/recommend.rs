//! Recommendation rules.

use std::collections::HashSet;

use standup_core::{QualityScore, Recommendation, RecommendationArea, TrendSummary};
use tracing::{debug, warn};

use crate::trend::TaskPatterns;

/// Why a single rule could not be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// A numeric input was NaN or infinite
    #[error("{field} is not a finite number: {value}")]
    NonFinite {
        /// Which input
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// Any other rule failure
    #[error("{0}")]
    Other(String),
}

/// Inputs every rule sees.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    /// Aggregated trend
    pub trend: &'a TrendSummary,
    /// Quality scores of processed records
    pub quality_scores: &'a [QualityScore],
    /// Completed task frequencies
    pub task_patterns: &'a TaskPatterns,
}

/// One independent recommendation rule.
pub trait RecommendationRule: Send + Sync {
    /// Short rule name for logs.
    fn name(&self) -> &str;

    /// Return a recommendation when the rule fires.
    fn evaluate(&self, input: &RecommendationInput<'_>) -> Result<Option<Recommendation>, RuleError>;
}

/// Fires when the mean completion rate is under target.
#[derive(Debug, Clone)]
pub struct CompletionRateRule {
    /// Target completion rate
    pub target: f64,
}

impl Default for CompletionRateRule {
    fn default() -> Self {
        Self { target: 0.8 }
    }
}

impl RecommendationRule for CompletionRateRule {
    fn name(&self) -> &str {
        "completion_rate"
    }

    fn evaluate(&self, input: &RecommendationInput<'_>) -> Result<Option<Recommendation>, RuleError> {
        let rate = input.trend.completion_rate_trend;
        if !rate.is_finite() {
            return Err(RuleError::NonFinite {
                field: "completion_rate_trend",
                value: rate,
            });
        }

        Ok((rate < self.target).then(|| {
            Recommendation::new(
                RecommendationArea::TaskCompletion,
                "Below target completion rate",
                "Consider breaking down tasks into smaller, manageable chunks",
            )
        }))
    }
}

/// Fires when any known quality score is under threshold.
#[derive(Debug, Clone, Default)]
pub struct QualityRule;

impl RecommendationRule for QualityRule {
    fn name(&self) -> &str {
        "response_quality"
    }

    fn evaluate(&self, input: &RecommendationInput<'_>) -> Result<Option<Recommendation>, RuleError> {
        let weak = input.quality_scores.iter().any(QualityScore::is_below_threshold);

        Ok(weak.then(|| {
            Recommendation::new(
                RecommendationArea::ResponseQuality,
                "Quality scores below threshold in some areas",
                "Focus on providing more detailed and structured responses",
            )
        }))
    }
}

/// Fires when too few distinct tasks were completed.
#[derive(Debug, Clone)]
pub struct TaskVarietyRule {
    /// Minimum number of distinct task names
    pub min_distinct: usize,
}

impl Default for TaskVarietyRule {
    fn default() -> Self {
        Self { min_distinct: 3 }
    }
}

impl RecommendationRule for TaskVarietyRule {
    fn name(&self) -> &str {
        "task_variety"
    }

    fn evaluate(&self, input: &RecommendationInput<'_>) -> Result<Option<Recommendation>, RuleError> {
        Ok((input.task_patterns.distinct() < self.min_distinct).then(|| {
            Recommendation::new(
                RecommendationArea::TaskVariety,
                "Limited variety in tasks",
                "Consider expanding skill set and taking on diverse responsibilities",
            )
        }))
    }
}

/// Runs an ordered list of rules.
pub struct RecommendationEngine {
    rules: Vec<Box<dyn RecommendationRule>>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(CompletionRateRule::default()),
                Box::new(QualityRule),
                Box::new(TaskVarietyRule::default()),
            ],
        }
    }
}

impl RecommendationEngine {
    /// Engine with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule.
    pub fn with_rule(mut self, rule: impl RecommendationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule in order.
    ///
    /// A failing rule is logged and skipped. Only the first recommendation
    /// for each area is kept.
    pub fn recommend(
        &self,
        trend: &TrendSummary,
        quality_scores: &[QualityScore],
        task_patterns: &TaskPatterns,
    ) -> Vec<Recommendation> {
        let input = RecommendationInput {
            trend,
            quality_scores,
            task_patterns,
        };

        let mut seen = HashSet::new();
        let mut recommendations = Vec::new();

        for rule in &self.rules {
            match rule.evaluate(&input) {
                Ok(Some(recommendation)) => {
                    if seen.insert(recommendation.area) {
                        debug!(rule = rule.name(), area = recommendation.area.label(), "Rule fired");
                        recommendations.push(recommendation);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(rule = rule.name(), error = %e, "Recommendation rule failed, skipping"),
            }
        }

        recommendations
    }
}
