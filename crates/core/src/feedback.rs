//! Stored feedback and message logs.

use serde::{Deserialize, Serialize};

use crate::id::{EmployeeId, FeedbackId, MessageLogId};
use crate::Time;

/// Kind of AI-generated feedback being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    /// Output of an insight run
    PerformanceInsights,
    /// Structured breakdown of a free-text update
    TaskAnalysis,
    /// Quality evaluation of a single update
    ResponseQuality,
}

impl FeedbackType {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::PerformanceInsights => "performance_insights",
            FeedbackType::TaskAnalysis => "task_analysis",
            FeedbackType::ResponseQuality => "response_quality",
        }
    }
}

impl std::fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "performance_insights" => Ok(FeedbackType::PerformanceInsights),
            "task_analysis" => Ok(FeedbackType::TaskAnalysis),
            "response_quality" => Ok(FeedbackType::ResponseQuality),
            other => Err(format!("unknown feedback type: {}", other)),
        }
    }
}

/// A stored piece of feedback. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Unique identifier
    pub id: FeedbackId,

    /// Employee the feedback is about
    pub employee_id: EmployeeId,

    /// Feedback kind
    pub feedback_type: FeedbackType,

    /// Serialized payload
    pub content: serde_json::Value,

    /// When stored
    pub created_at: Time,
}

/// Acknowledgement returned by a feedback sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    /// Id of the stored record
    pub id: FeedbackId,

    /// When it was stored
    pub stored_at: Time,
}

/// Direction of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    /// Sent by the employee
    Inbound,
    /// Sent to the employee
    Outbound,
}

/// A message exchanged with an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    /// Unique identifier
    pub id: MessageLogId,

    /// Employee involved
    pub employee_id: EmployeeId,

    /// Inbound or outbound
    pub direction: MessageDirection,

    /// Template key or free-form label, e.g. `daily_updates/morning`
    pub message_type: String,

    /// Message body
    pub content: String,

    /// When sent or received
    pub sent_at: Time,

    /// Delivery attempt, starting at 1
    pub attempt_number: u32,
}

impl MessageLog {
    /// Log an outbound message.
    pub fn outbound(
        employee_id: EmployeeId,
        message_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageLogId::new(),
            employee_id,
            direction: MessageDirection::Outbound,
            message_type: message_type.into(),
            content: content.into(),
            sent_at: chrono::Utc::now(),
            attempt_number: 1,
        }
    }

    /// Log an inbound message.
    pub fn inbound(employee_id: EmployeeId, content: impl Into<String>) -> Self {
        Self {
            direction: MessageDirection::Inbound,
            ..Self::outbound(employee_id, "update", content)
        }
    }
}
