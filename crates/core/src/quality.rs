//! Response quality scores returned by the evaluator.

use serde::{Deserialize, Serialize};

/// Quality threshold below which a response counts as weak.
pub const QUALITY_THRESHOLD: f64 = 7.0;

/// Scores an evaluator assigned to one employee update.
///
/// Every field is optional because the values come from a language model
/// and may be absent or misnamed. Consumers must treat a missing value as
/// unknown, never as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// How complete the update is (1-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness: Option<f64>,

    /// How clearly it is written (1-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarity: Option<f64>,

    /// Professional tone (1-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_tone: Option<f64>,

    /// Problem-solving approach (1-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_solving: Option<f64>,

    /// Overall score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,

    /// Suggestions for improvement
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feedback: Vec<String>,
}

impl QualityScore {
    /// A score carrying only an overall value.
    pub fn with_average(average_score: f64) -> Self {
        Self {
            average_score: Some(average_score),
            ..Default::default()
        }
    }

    /// Mean of the four dimension scores, when all four are present.
    pub fn dimension_mean(&self) -> Option<f64> {
        let dims = [
            self.completeness?,
            self.clarity?,
            self.professional_tone?,
            self.problem_solving?,
        ];
        Some(dims.iter().sum::<f64>() / dims.len() as f64)
    }

    /// Whether the overall score is known and under [`QUALITY_THRESHOLD`].
    ///
    /// Missing or non-finite scores never count as below threshold.
    pub fn is_below_threshold(&self) -> bool {
        matches!(self.average_score, Some(score) if score.is_finite() && score < QUALITY_THRESHOLD)
    }
}
