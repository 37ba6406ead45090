//! Storage trait abstraction.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;
use standup_core::{
    DailyTask, Employee, EmployeeId, FeedbackReceipt, FeedbackRecord, FeedbackType, MessageLog,
    TaskRecord,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(String),

    /// The employee is not registered
    #[error("Unknown employee: {0}")]
    UnknownEmployee(EmployeeId),

    /// The backing store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Read access to employees' daily task history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Records of `employee` whose day lies in `[start, end]`, oldest first.
    ///
    /// An empty range is not an error. An unknown employee is.
    async fn get_history(
        &self,
        employee: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TaskRecord>>;
}

/// Append-only destination for AI-generated feedback.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Store one feedback payload. Never retries on failure.
    async fn store(
        &self,
        employee: &EmployeeId,
        feedback_type: FeedbackType,
        content: &serde_json::Value,
    ) -> Result<FeedbackReceipt>;
}

/// Full storage abstraction for standup data.
///
/// This trait allows different storage backends to be plugged in.
#[async_trait]
pub trait Storage: HistoryStore + FeedbackSink {
    // === Employee operations ===

    /// Save an employee (create or update).
    async fn save_employee(&self, employee: &Employee) -> Result<()>;

    /// Load an employee by ID.
    async fn load_employee(&self, id: &EmployeeId) -> Result<Option<Employee>>;

    /// List all employees.
    async fn list_employees(&self) -> Result<Vec<Employee>>;

    /// Find the employee owning a WhatsApp number.
    async fn find_employee_by_phone(&self, phone: &str) -> Result<Option<Employee>> {
        Ok(self
            .list_employees()
            .await?
            .into_iter()
            .find(|e| e.whatsapp_number == phone))
    }

    // === Daily task operations ===

    /// Save a daily task row, replacing the row for the same employee and day.
    async fn save_daily_task(&self, task: &DailyTask) -> Result<()>;

    /// Load the row for one employee and day.
    async fn load_daily_task(&self, employee: &EmployeeId, day: NaiveDate) -> Result<Option<DailyTask>>;

    // === Feedback operations ===

    /// List stored feedback for an employee, oldest first.
    async fn list_feedback(&self, employee: &EmployeeId) -> Result<Vec<FeedbackRecord>>;

    // === Message log operations ===

    /// Append a message log entry.
    async fn log_message(&self, log: &MessageLog) -> Result<()>;

    /// Most recent messages for an employee, newest first.
    async fn recent_messages(&self, employee: &EmployeeId, limit: usize) -> Result<Vec<MessageLog>>;
}

/// Convert a stored row, warning when text columns are missing.
pub(crate) fn to_record(row: &DailyTask) -> TaskRecord {
    if row.is_malformed() {
        warn!(
            employee = %row.employee_id,
            date = %row.task_date,
            "Daily task row is missing task text, treating missing lists as empty"
        );
    }
    row.to_record()
}
