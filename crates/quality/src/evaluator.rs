//! Quality evaluator abstraction.

use async_trait::async_trait;
use chrono::NaiveDate;
use standup_core::{EmployeeId, QualityScore};

/// Error type for evaluations.
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Why one update could not be scored.
///
/// Always recoverable at the pipeline level: the record is skipped.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// The model provider failed
    #[error("Model call failed: {0}")]
    Provider(#[from] standup_ai::LlmError),

    /// The provider answered but the reply had no usable scores
    #[error("Malformed evaluation: {0}")]
    Malformed(String),

    /// The evaluation did not finish in time
    #[error("Evaluation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// What an evaluator knows about the update it scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    /// Day the update is about
    pub task_date: NaiveDate,

    /// Author of the update
    pub employee_id: EmployeeId,
}

impl EvaluationContext {
    /// Create a context.
    pub fn new(employee_id: EmployeeId, task_date: NaiveDate) -> Self {
        Self {
            task_date,
            employee_id,
        }
    }
}

/// Scores the quality of a free-text update.
#[async_trait]
pub trait QualityEvaluator: Send + Sync {
    /// Score `response_text`.
    async fn evaluate(&self, response_text: &str, context: &EvaluationContext) -> Result<QualityScore>;
}
