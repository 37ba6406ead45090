//! Structured breakdown of a free-text daily update.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::llm::{ChatModel, ChatRequest, Result};
use crate::parser::extract_json;

const SYSTEM_PROMPT: &str = "You are an AI task analysis expert.";

/// Priority of an analyzed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Urgent
    High,
    /// Normal
    #[default]
    Medium,
    /// Can wait
    Low,
}

/// Status of an analyzed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not picked up yet
    #[default]
    NotStarted,
    /// Being worked on
    InProgress,
    /// Done
    Completed,
    /// Waiting on something
    Blocked,
    /// Behind schedule
    Delayed,
}

/// One task the model found in an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedTask {
    /// Short task name
    pub name: String,

    /// Longer description
    #[serde(default)]
    pub description: String,

    /// Priority
    #[serde(default)]
    pub priority: Priority,

    /// Status
    #[serde(default)]
    pub status: TaskStatus,

    /// Estimated effort in hours
    #[serde(default)]
    pub estimated_hours: f64,

    /// Progress from 0 to 100
    #[serde(default)]
    pub completion_percentage: f64,

    /// Blockers
    #[serde(default)]
    pub blockers: Vec<String>,

    /// Dependencies
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Risks
    #[serde(default)]
    pub risks: Vec<String>,
}

/// Result of analyzing one update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskAnalysis {
    /// Tasks found
    #[serde(default)]
    pub tasks: Vec<AnalyzedTask>,

    /// Overall assessment
    #[serde(default)]
    pub overall_assessment: String,

    /// Suggested next steps
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl TaskAnalysis {
    /// Tasks currently blocked.
    pub fn blocked(&self) -> impl Iterator<Item = &AnalyzedTask> {
        self.tasks.iter().filter(|t| t.status == TaskStatus::Blocked)
    }
}

/// Breaks a daily update into tasks with priority, status and risks.
pub struct TaskAnalyzer {
    model: Arc<dyn ChatModel>,
}

impl TaskAnalyzer {
    /// Create an analyzer backed by `model`.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Analyze one update.
    #[instrument(skip_all, fields(len = update.len()))]
    pub async fn analyze(&self, update: &str) -> Result<TaskAnalysis> {
        let request = ChatRequest::new()
            .system(SYSTEM_PROMPT)
            .user(build_prompt(update))
            .temperature(0.3);

        let reply = self.model.complete(request).await?;
        let analysis: TaskAnalysis = extract_json(&reply)?;
        debug!(tasks = analysis.tasks.len(), "Update analyzed");
        Ok(analysis)
    }
}

fn build_prompt(update: &str) -> String {
    format!(
        r#"Analyze the following employee update in detail:

{update}

Break it down into tasks. For each task give its dependencies, blockers,
estimated hours, priority, current status, completion percentage and risks.

Respond with JSON only, using this structure:
{{
  "tasks": [
    {{
      "name": "task name",
      "description": "description",
      "priority": "high|medium|low",
      "status": "not_started|in_progress|completed|blocked|delayed",
      "estimated_hours": 0.0,
      "completion_percentage": 0.0,
      "blockers": [],
      "dependencies": [],
      "risks": []
    }}
  ],
  "overall_assessment": "assessment text",
  "recommendations": []
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedModel {
        reply: String,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl CannedModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, request: ChatRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_analyze_parses_fenced_reply() {
        let model = CannedModel::new(
            r#"```json
{
  "tasks": [
    {"name": "Website redesign", "priority": "high", "status": "in_progress",
     "estimated_hours": 6, "completion_percentage": 40, "blockers": []},
    {"name": "Mobile bug fixes", "status": "blocked", "blockers": ["waiting on QA"]}
  ],
  "overall_assessment": "Solid day",
  "recommendations": ["Ping QA"]
}
```"#,
        );
        let analyzer = TaskAnalyzer::new(model.clone());

        let analysis = analyzer
            .analyze("Worked on the website redesign and mobile bugs")
            .await
            .unwrap();

        assert_eq!(analysis.tasks.len(), 2);
        assert_eq!(analysis.tasks[0].priority, Priority::High);
        assert_eq!(analysis.tasks[0].estimated_hours, 6.0);
        assert_eq!(analysis.tasks[1].priority, Priority::Medium);
        assert_eq!(analysis.blocked().count(), 1);
        assert_eq!(analysis.recommendations, vec!["Ping QA".to_string()]);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].temperature, Some(0.3));
        assert!(seen[0].messages[1].content.contains("website redesign"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_prose() {
        let analyzer = TaskAnalyzer::new(CannedModel::new("I could not analyze that."));
        let err = analyzer.analyze("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidJson(_)));
    }
}
