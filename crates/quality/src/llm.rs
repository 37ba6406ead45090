//! Language-model backed quality evaluator.

use async_trait::async_trait;
use serde_json::{Map, Value};
use standup_ai::{extract_json, ChatModel, ChatRequest};
use standup_core::QualityScore;
use tracing::{debug, instrument};

use crate::evaluator::{EvaluationContext, EvaluationError, QualityEvaluator, Result};

const SYSTEM_PROMPT: &str = "You are an AI communication analyst reviewing employee daily updates.";

/// Evaluator asking a chat model for the four dimension scores.
pub struct LlmQualityEvaluator<M: ChatModel> {
    model: M,
    temperature: f32,
}

impl<M: ChatModel> LlmQualityEvaluator<M> {
    /// Create an evaluator.
    pub fn new(model: M) -> Self {
        Self {
            model,
            temperature: 0.3,
        }
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl<M: ChatModel> QualityEvaluator for LlmQualityEvaluator<M> {
    #[instrument(skip_all, fields(employee = %context.employee_id, date = %context.task_date))]
    async fn evaluate(&self, response_text: &str, context: &EvaluationContext) -> Result<QualityScore> {
        let request = ChatRequest::new()
            .system(SYSTEM_PROMPT)
            .user(build_prompt(response_text, context))
            .temperature(self.temperature);

        let reply = self.model.complete(request).await?;
        let score = parse_score(&reply)?;
        debug!(average = ?score.average_score, "Update scored");
        Ok(score)
    }
}

fn build_prompt(response_text: &str, context: &EvaluationContext) -> String {
    format!(
        r#"Analyze this task response for quality and completeness.
Task context: employee {employee}, work day {date}
Response: {response_text}

Score each dimension from 1 to 10:
1. completeness
2. clarity
3. professional_tone
4. problem_solving

Respond with JSON only:
{{"completeness": 0, "clarity": 0, "professional_tone": 0, "problem_solving": 0,
  "average_score": 0, "feedback": ["specific suggestion"]}}"#,
        employee = context.employee_id,
        date = context.task_date,
    )
}

/// Parse a model reply into a [`QualityScore`].
///
/// Tolerates scores nested under `scores`, numbers sent as strings, and
/// feedback sent as a single string. When `average_score` is absent and
/// all four dimensions are present, their mean is used.
pub fn parse_score(reply: &str) -> Result<QualityScore> {
    let value: Value = extract_json(reply).map_err(|e| EvaluationError::Malformed(e.to_string()))?;
    let root = value
        .as_object()
        .ok_or_else(|| EvaluationError::Malformed("expected a JSON object".to_string()))?;
    let scores = root.get("scores").and_then(Value::as_object).unwrap_or(root);

    let lookup = |keys: &[&str]| number(scores, keys).or_else(|| number(root, keys));

    let mut score = QualityScore {
        completeness: lookup(&["completeness"]),
        clarity: lookup(&["clarity"]),
        professional_tone: lookup(&["professional_tone", "professionalTone", "professional tone"]),
        problem_solving: lookup(&[
            "problem_solving",
            "problemSolving",
            "problem_solving_approach",
            "problem-solving approach",
        ]),
        average_score: lookup(&["average_score", "averageScore", "average", "overall_score"]),
        feedback: feedback(root),
    };

    if score.average_score.is_none() {
        score.average_score = score.dimension_mean();
    }

    let any_score = [
        score.completeness,
        score.clarity,
        score.professional_tone,
        score.problem_solving,
        score.average_score,
    ]
    .iter()
    .any(Option::is_some);
    if !any_score {
        return Err(EvaluationError::Malformed("reply contains no scores".to_string()));
    }

    Ok(score)
}

fn number(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn feedback(root: &Map<String, Value>) -> Vec<String> {
    let raw = ["feedback", "suggestions", "improvements"]
        .iter()
        .find_map(|key| root.get(*key));

    match raw {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use standup_ai::LlmError;
    use standup_core::EmployeeId;
    use std::sync::Mutex;

    struct CannedModel {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedModel {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("boom".to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, request: ChatRequest) -> standup_ai::Result<String> {
            if let Some(last) = request.messages.last() {
                self.prompts.lock().unwrap().push(last.content.clone());
            }
            self.reply
                .clone()
                .map_err(|body| LlmError::Status { status: 500, body })
        }
    }

    fn context() -> EvaluationContext {
        EvaluationContext::new(
            EmployeeId::from("E1"),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_evaluate_reads_scores() {
        let evaluator = LlmQualityEvaluator::new(CannedModel::ok(
            r#"{"completeness": 8, "clarity": 7, "professional_tone": 9, "problem_solving": 6,
                "average_score": 7.5, "feedback": ["Mention blockers"]}"#,
        ));

        let score = evaluator.evaluate("Fixed login bug", &context()).await.unwrap();

        assert_eq!(score.completeness, Some(8.0));
        assert_eq!(score.average_score, Some(7.5));
        assert_eq!(score.feedback, vec!["Mention blockers".to_string()]);

        let prompts = evaluator.model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Fixed login bug"));
        assert!(prompts[0].contains("2024-03-04"));
    }

    #[tokio::test]
    async fn test_evaluate_provider_failure() {
        let evaluator = LlmQualityEvaluator::new(CannedModel::failing());
        let err = evaluator.evaluate("text", &context()).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Provider(_)));
    }

    #[tokio::test]
    async fn test_evaluate_malformed_reply() {
        let evaluator = LlmQualityEvaluator::new(CannedModel::ok("Looks great to me!"));
        let err = evaluator.evaluate("text", &context()).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Malformed(_)));
    }

    #[test]
    fn test_average_filled_from_dimensions() {
        let score = parse_score(
            r#"{"scores": {"completeness": 6, "clarity": 8, "professional_tone": 7, "problem_solving": 7}}"#,
        )
        .unwrap();
        assert_eq!(score.average_score, Some(7.0));
    }

    #[test]
    fn test_partial_dimensions_leave_average_unknown() {
        let score = parse_score(r#"{"completeness": "5", "feedback": "Add detail"}"#).unwrap();
        assert_eq!(score.completeness, Some(5.0));
        assert_eq!(score.average_score, None);
        assert_eq!(score.feedback, vec!["Add detail".to_string()]);
        assert!(!score.is_below_threshold());
    }

    #[test]
    fn test_no_scores_is_malformed() {
        let err = parse_score(r#"{"feedback": []}"#).unwrap_err();
        assert!(matches!(err, EvaluationError::Malformed(_)));
    }
}
