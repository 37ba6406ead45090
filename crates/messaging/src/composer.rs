//! Personalized message composition with static fallbacks.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use standup_ai::{ChatModel, ChatRequest, LlmError};
use standup_core::InsightResult;
use tracing::{debug, warn};

use crate::templates::{MessageTemplates, TemplateKey};

/// Plain reminder used when no template can be rendered.
pub const DAILY_REMINDER: &str = "Hi! Please share your daily updates:
1. Tasks completed today
2. Any blockers or challenges
3. Plans for tomorrow";

/// Weekly report sent when no insight can be computed.
pub const WEEKLY_REPORT_FALLBACK: &str = "Weekly Performance Summary:
Your summary could not be prepared this week.
Please keep sharing your daily updates so we can track your progress.
";

/// Why a personalized message could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// No model configured
    #[error("No language model configured")]
    NoModel,

    /// No insight to personalize from
    #[error("No performance insight available")]
    NoInsight,

    /// The model call failed
    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    /// The model returned nothing
    #[error("Model returned an empty message")]
    EmptyReply,
}

/// Kind of message to compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Morning request for updates
    MorningCheckIn,
    /// Feedback on recent performance
    PerformanceFeedback,
    /// Any other template key
    Other(TemplateKey),
}

impl MessageKind {
    /// Template key for this kind.
    pub fn key(&self) -> TemplateKey {
        match self {
            MessageKind::MorningCheckIn => TemplateKey::new("daily_updates", "morning"),
            MessageKind::PerformanceFeedback => TemplateKey::new("feedback", "performance"),
            MessageKind::Other(key) => key.clone(),
        }
    }
}

impl From<TemplateKey> for MessageKind {
    fn from(key: TemplateKey) -> Self {
        match (key.category.as_str(), key.kind.as_str()) {
            ("daily_updates", "morning") => MessageKind::MorningCheckIn,
            ("feedback", "performance") => MessageKind::PerformanceFeedback,
            _ => MessageKind::Other(key),
        }
    }
}

/// Writes employee-facing messages, personalized by a model when possible.
pub struct MessageComposer {
    templates: MessageTemplates,
    model: Option<Arc<dyn ChatModel>>,
}

impl MessageComposer {
    /// Composer that only uses static templates.
    pub fn new(templates: MessageTemplates) -> Self {
        Self {
            templates,
            model: None,
        }
    }

    /// Personalize messages with `model`.
    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Template registry.
    pub fn templates(&self) -> &MessageTemplates {
        &self.templates
    }

    /// Compose a message, falling back to a static template on any failure.
    pub async fn compose(
        &self,
        kind: &MessageKind,
        insight: Option<&InsightResult>,
        context: Option<&JsonValue>,
    ) -> String {
        match self.try_compose(kind, insight, context).await {
            Ok(message) => message,
            Err(e) => {
                warn!(kind = %kind.key(), error = %e, "Falling back to static template");
                self.fallback(kind)
            }
        }
    }

    /// Compose a personalized message without falling back.
    pub async fn try_compose(
        &self,
        kind: &MessageKind,
        insight: Option<&InsightResult>,
        context: Option<&JsonValue>,
    ) -> Result<String, ComposeError> {
        let model = self.model.as_ref().ok_or(ComposeError::NoModel)?;
        let insight = insight.ok_or(ComposeError::NoInsight)?;

        let prompt = build_prompt(kind, insight, context);
        let reply = model.complete(ChatRequest::new().user(prompt)).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(ComposeError::EmptyReply);
        }

        debug!(kind = %kind.key(), len = reply.len(), "Personalized message composed");
        Ok(reply.to_string())
    }

    /// Static message for `kind`.
    ///
    /// Uses the template of the same key when it renders without
    /// parameters, then the morning template, then [`DAILY_REMINDER`].
    pub fn fallback(&self, kind: &MessageKind) -> String {
        let none = HashMap::new();
        self.templates
            .render(&kind.key(), &none)
            .or_else(|_| self.templates.render(&MessageKind::MorningCheckIn.key(), &none))
            .unwrap_or_else(|_| DAILY_REMINDER.to_string())
    }
}

fn build_prompt(kind: &MessageKind, insight: &InsightResult, context: Option<&JsonValue>) -> String {
    let summary = &insight.trend_summary;
    let common_tasks = summary
        .common_tasks
        .iter()
        .map(|t| format!("{} ({})", t.task, t.count))
        .collect::<Vec<_>>()
        .join(", ");
    let recommendations = insight
        .recommendations
        .iter()
        .map(|r| format!("{}: {} - {}", r.area.label(), r.observation, r.suggestion))
        .collect::<Vec<_>>()
        .join("; ");

    let mut prompt = match kind {
        MessageKind::MorningCheckIn => format!(
            "Create a personalized morning update request message considering:
- Previous completion rate: {rate}%
- Recent task patterns: {common_tasks}
- Current recommendations: {recommendations}

The message should be professional but friendly, reference their work
patterns, use appropriate emojis for WhatsApp, and be motivating.",
            rate = insight.completion_percentage(),
        ),
        MessageKind::PerformanceFeedback => {
            let quality = summary
                .quality_trend
                .iter()
                .map(|s| match s.average_score {
                    Some(score) => format!("{score:.1}"),
                    None => "n/a".to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Generate constructive feedback based on:
- Quality trend (average scores): {quality}
- Task completion patterns: {common_tasks}
- Areas for improvement: {recommendations}

The feedback should be specific and actionable, balance praise with
improvement areas, stay encouraging, and end with concrete next steps."
            )
        }
        MessageKind::Other(_) => {
            "Generate a professional and friendly message appropriate for WhatsApp.".to_string()
        }
    };

    if let Some(context) = context {
        let pretty = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
        let _ = write!(prompt, "\n\nAdditional context:\n{pretty}");
    }

    prompt
}

/// Short weekly summary: completion rate and the first two suggestions.
pub fn weekly_report(insight: &InsightResult) -> String {
    let mut report = format!(
        "Weekly Performance Summary:\nCompletion Rate: {}%\nKey Recommendations:\n",
        insight.completion_percentage()
    );
    for recommendation in insight.recommendations.iter().take(2) {
        let _ = writeln!(report, "- {}", recommendation.suggestion);
    }
    report
}
