//! Daily task records - what an employee planned and what they finished.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::id::EmployeeId;
use crate::Time;

/// One employee-day of planned and completed tasks, as read from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Calendar day the tasks belong to
    pub task_date: NaiveDate,

    /// Tasks announced in the morning, in the order they were written
    pub tasks_planned: Vec<String>,

    /// Tasks reported as done, in the order they were written
    pub tasks_completed: Vec<String>,
}

impl TaskRecord {
    /// Create a record from already split task lists.
    pub fn new<P, C>(task_date: NaiveDate, planned: P, completed: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            task_date,
            tasks_planned: planned.into_iter().map(Into::into).collect(),
            tasks_completed: completed.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a record from the newline separated text employees send.
    ///
    /// Missing text yields an empty list. Blank lines are dropped.
    pub fn from_text(task_date: NaiveDate, planned: Option<&str>, completed: Option<&str>) -> Self {
        Self {
            task_date,
            tasks_planned: split_tasks(planned.unwrap_or_default()),
            tasks_completed: split_tasks(completed.unwrap_or_default()),
        }
    }

    /// The completed tasks joined back into the text form the employee sent.
    pub fn completed_text(&self) -> String {
        self.tasks_completed.join("\n")
    }
}

/// Split an update into task names, one per line.
///
/// Lines are trimmed and empty lines removed, so `""` gives no tasks.
pub fn split_tasks(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Status of a stored daily task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyTaskStatus {
    /// Plan received, no completion update yet
    Pending,
    /// Completion update received
    Updated,
}

impl DailyTaskStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DailyTaskStatus::Pending => "pending",
            DailyTaskStatus::Updated => "updated",
        }
    }
}

/// A daily task row as kept by storage.
///
/// The text columns are optional: rows written before an employee replied
/// carry no completion text, and older rows may lack a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTask {
    /// Owner
    pub employee_id: EmployeeId,

    /// Day the row covers
    pub task_date: NaiveDate,

    /// Planned tasks, newline separated
    #[serde(default)]
    pub tasks_planned: Option<String>,

    /// Completed tasks, newline separated
    #[serde(default)]
    pub tasks_completed: Option<String>,

    /// Row status
    pub status: DailyTaskStatus,

    /// When the row was created
    pub created_at: Time,
}

impl DailyTask {
    /// Create a pending row holding the morning plan.
    pub fn planned(employee_id: EmployeeId, task_date: NaiveDate, tasks_planned: impl Into<String>) -> Self {
        Self {
            employee_id,
            task_date,
            tasks_planned: Some(tasks_planned.into()),
            tasks_completed: None,
            status: DailyTaskStatus::Pending,
            created_at: chrono::Utc::now(),
        }
    }

    /// Attach the completion update.
    pub fn complete(mut self, tasks_completed: impl Into<String>) -> Self {
        self.tasks_completed = Some(tasks_completed.into());
        self.status = DailyTaskStatus::Updated;
        self
    }

    /// Whether either text column is missing.
    pub fn is_malformed(&self) -> bool {
        self.tasks_planned.is_none() || self.tasks_completed.is_none()
    }

    /// Convert into the record shape the insight pipeline reads.
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord::from_text(
            self.task_date,
            self.tasks_planned.as_deref(),
            self.tasks_completed.as_deref(),
        )
    }
}

/// Set-based comparison of one record's planned and completed tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMetrics {
    /// Distinct planned tasks
    pub total_planned: usize,

    /// Distinct completed tasks
    pub total_completed: usize,

    /// `total_completed / total_planned`, 0 when nothing was planned.
    /// Not clamped: extra work can push it above 1.
    pub completion_rate: f64,

    /// Planned but not completed
    pub incomplete_tasks: BTreeSet<String>,

    /// Completed without being planned
    pub additional_tasks: BTreeSet<String>,

    /// At least 80% of the plan was completed
    pub on_track: bool,
}

impl Default for CompletionMetrics {
    fn default() -> Self {
        Self {
            total_planned: 0,
            total_completed: 0,
            completion_rate: 0.0,
            incomplete_tasks: BTreeSet::new(),
            additional_tasks: BTreeSet::new(),
            on_track: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_split_tasks_drops_blank_lines() {
        let tasks = split_tasks("Task 1\n\n  Task 2  \n   \n");
        assert_eq!(tasks, vec!["Task 1", "Task 2"]);
    }

    #[test]
    fn test_split_tasks_empty() {
        assert!(split_tasks("").is_empty());
    }

    #[test]
    fn test_from_text_missing_fields() {
        let record = TaskRecord::from_text(day(1), None, Some("A"));
        assert!(record.tasks_planned.is_empty());
        assert_eq!(record.tasks_completed, vec!["A"]);
    }

    #[test]
    fn test_completed_text() {
        let record = TaskRecord::new(day(1), ["A"], ["A", "C"]);
        assert_eq!(record.completed_text(), "A\nC");
    }

    #[test]
    fn test_daily_task_lifecycle() {
        let row = DailyTask::planned(EmployeeId::from("E1"), day(2), "A\nB");
        assert_eq!(row.status, DailyTaskStatus::Pending);
        assert!(row.is_malformed());

        let row = row.complete("A");
        assert_eq!(row.status, DailyTaskStatus::Updated);
        assert!(!row.is_malformed());

        let record = row.to_record();
        assert_eq!(record.tasks_planned, vec!["A", "B"]);
        assert_eq!(record.tasks_completed, vec!["A"]);
        assert_eq!(record.task_date, day(2));
    }

    #[test]
    fn test_daily_task_deserializes_without_text_columns() {
        let json = r#"{
            "employee_id": "E1",
            "task_date": "2024-03-04",
            "status": "pending",
            "created_at": "2024-03-04T08:00:00Z"
        }"#;
        let row: DailyTask = serde_json::from_str(json).unwrap();
        assert!(row.tasks_planned.is_none());
        assert!(row.to_record().tasks_planned.is_empty());
    }

    #[test]
    fn test_completion_metrics_default() {
        let metrics = CompletionMetrics::default();
        assert_eq!(metrics.completion_rate, 0.0);
        assert!(!metrics.on_track);
    }
}
