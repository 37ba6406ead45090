//! Response quality scoring.
//!
//! Scores how complete, clear, professional and solution-oriented an
//! employee's update is.

#![warn(missing_docs)]

pub mod evaluator;
pub mod llm;

pub use evaluator::{EvaluationContext, EvaluationError, QualityEvaluator, Result};
pub use llm::{parse_score, LlmQualityEvaluator};
