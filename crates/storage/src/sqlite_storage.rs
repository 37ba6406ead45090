//! SQLite storage backend for standup.
//!
//! Mirrors the tables of the hosted database the assistant was first run
//! against (`employees`, `daily_tasks`, `ai_feedback`, `message_logs`), so
//! the same queries work against a local file.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use standup_core::{
    DailyTask, DailyTaskStatus, Employee, EmployeeId, EmployeeStatus, FeedbackId,
    FeedbackReceipt, FeedbackRecord, FeedbackType, MessageDirection, MessageLog, TaskRecord,
};
use std::path::Path;
use tracing::{debug, warn};

use super::trait_::{to_record, FeedbackSink, HistoryStore, Result, Storage, StorageError};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance.
    pub async fn new(db_url: &str) -> Result<Self> {
        let pool = sqlx::SqlitePool::connect(db_url).await.map_err(unavailable)?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Open (creating if needed) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        Self::new(&format!("sqlite://{}?mode=rwc", path.display())).await
    }

    /// Create an in-memory SQLite storage for testing.
    ///
    /// Uses a single connection, since every in-memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(unavailable)?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS employees (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                whatsapp_number TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_active TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS daily_tasks (
                employee_id TEXT NOT NULL,
                task_date TEXT NOT NULL,
                tasks_planned TEXT,
                tasks_completed TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (employee_id, task_date)
            )",
            "CREATE TABLE IF NOT EXISTS ai_feedback (
                id TEXT PRIMARY KEY,
                employee_id TEXT NOT NULL,
                feedback_type TEXT NOT NULL,
                feedback_content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS message_logs (
                id TEXT PRIMARY KEY,
                employee_id TEXT NOT NULL,
                direction TEXT NOT NULL,
                message_type TEXT NOT NULL,
                message_content TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                attempt_number INTEGER NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_feedback_employee ON ai_feedback(employee_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_messages_employee ON message_logs(employee_id, sent_at)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(database)?;
        }

        Ok(())
    }

    /// Check that the database answers.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn employee_exists(&self, id: &EmployeeId) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM employees WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        let n: i64 = row.try_get("n").map_err(database)?;
        Ok(n > 0)
    }

    fn employee_from_row(row: &SqliteRow) -> Result<Employee> {
        let status: String = row.try_get("status").map_err(database)?;
        Ok(Employee {
            id: EmployeeId::new(row.try_get::<String, _>("id").map_err(database)?),
            name: row.try_get("name").map_err(database)?,
            whatsapp_number: row.try_get("whatsapp_number").map_err(database)?,
            status: match status.as_str() {
                "inactive" => EmployeeStatus::Inactive,
                _ => EmployeeStatus::Active,
            },
            created_at: parse_time(row, "created_at")?,
            last_active: parse_time(row, "last_active")?,
        })
    }

    fn daily_task_from_row(row: &SqliteRow) -> Result<DailyTask> {
        let status: String = row.try_get("status").map_err(database)?;
        Ok(DailyTask {
            employee_id: EmployeeId::new(row.try_get::<String, _>("employee_id").map_err(database)?),
            task_date: parse_date(row, "task_date")?,
            tasks_planned: row.try_get("tasks_planned").map_err(database)?,
            tasks_completed: row.try_get("tasks_completed").map_err(database)?,
            status: match status.as_str() {
                "updated" => DailyTaskStatus::Updated,
                _ => DailyTaskStatus::Pending,
            },
            created_at: parse_time(row, "created_at")?,
        })
    }

    fn message_from_row(row: &SqliteRow) -> Result<MessageLog> {
        let direction: String = row.try_get("direction").map_err(database)?;
        let id: String = row.try_get("id").map_err(database)?;
        let attempt: i64 = row.try_get("attempt_number").map_err(database)?;
        Ok(MessageLog {
            id: id.parse().map_err(|e| StorageError::Other(format!("bad message id: {}", e)))?,
            employee_id: EmployeeId::new(row.try_get::<String, _>("employee_id").map_err(database)?),
            direction: match direction.as_str() {
                "inbound" => MessageDirection::Inbound,
                _ => MessageDirection::Outbound,
            },
            message_type: row.try_get("message_type").map_err(database)?,
            content: row.try_get("message_content").map_err(database)?,
            sent_at: parse_time(row, "sent_at")?,
            attempt_number: u32::try_from(attempt).unwrap_or(1),
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteStorage {
    async fn get_history(
        &self,
        employee: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TaskRecord>> {
        if !self.employee_exists(employee).await? {
            return Err(StorageError::UnknownEmployee(employee.clone()));
        }

        let rows = sqlx::query(
            "SELECT employee_id, task_date, tasks_planned, tasks_completed, status, created_at
             FROM daily_tasks
             WHERE employee_id = ? AND task_date >= ? AND task_date <= ?
             ORDER BY task_date ASC",
        )
        .bind(employee.as_str())
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        debug!(employee = %employee, %start, %end, rows = rows.len(), "Loaded task history");

        rows.iter()
            .map(|row| Self::daily_task_from_row(row).map(|task| to_record(&task)))
            .collect()
    }
}

#[async_trait]
impl FeedbackSink for SqliteStorage {
    async fn store(
        &self,
        employee: &EmployeeId,
        feedback_type: FeedbackType,
        content: &serde_json::Value,
    ) -> Result<FeedbackReceipt> {
        let id = FeedbackId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO ai_feedback (id, employee_id, feedback_type, feedback_content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(employee.as_str())
        .bind(feedback_type.as_str())
        .bind(serde_json::to_string(content)?)
        .bind(now.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(FeedbackReceipt { id, stored_at: now })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save_employee(&self, employee: &Employee) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO employees (id, name, whatsapp_number, status, created_at, last_active)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(employee.id.as_str())
        .bind(&employee.name)
        .bind(&employee.whatsapp_number)
        .bind(match employee.status {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
        })
        .bind(employee.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .bind(employee.last_active.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(())
    }

    async fn load_employee(&self, id: &EmployeeId) -> Result<Option<Employee>> {
        let row = sqlx::query("SELECT * FROM employees WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

        row.as_ref().map(Self::employee_from_row).transpose()
    }

    async fn list_employees(&self) -> Result<Vec<Employee>> {
        let rows = sqlx::query("SELECT * FROM employees ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;

        rows.iter().map(Self::employee_from_row).collect()
    }

    async fn find_employee_by_phone(&self, phone: &str) -> Result<Option<Employee>> {
        let row = sqlx::query("SELECT * FROM employees WHERE whatsapp_number = ? LIMIT 1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

        row.as_ref().map(Self::employee_from_row).transpose()
    }

    async fn save_daily_task(&self, task: &DailyTask) -> Result<()> {
        if !self.employee_exists(&task.employee_id).await? {
            return Err(StorageError::UnknownEmployee(task.employee_id.clone()));
        }

        sqlx::query(
            "INSERT OR REPLACE INTO daily_tasks
                (employee_id, task_date, tasks_planned, tasks_completed, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(task.employee_id.as_str())
        .bind(task.task_date.to_string())
        .bind(task.tasks_planned.as_deref())
        .bind(task.tasks_completed.as_deref())
        .bind(task.status.as_str())
        .bind(task.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(())
    }

    async fn load_daily_task(&self, employee: &EmployeeId, day: NaiveDate) -> Result<Option<DailyTask>> {
        let row = sqlx::query("SELECT * FROM daily_tasks WHERE employee_id = ? AND task_date = ?")
            .bind(employee.as_str())
            .bind(day.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

        row.as_ref().map(Self::daily_task_from_row).transpose()
    }

    async fn list_feedback(&self, employee: &EmployeeId) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM ai_feedback WHERE employee_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(employee.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(database)?;
            let feedback_type: String = row.try_get("feedback_type").map_err(database)?;
            let content: String = row.try_get("feedback_content").map_err(database)?;

            let Ok(feedback_type) = feedback_type.parse::<FeedbackType>() else {
                warn!(id = %id, "Skipping feedback row with unknown type");
                continue;
            };

            records.push(FeedbackRecord {
                id: id.parse().map_err(|e| StorageError::Other(format!("bad feedback id: {}", e)))?,
                employee_id: employee.clone(),
                feedback_type,
                content: serde_json::from_str(&content)?,
                created_at: parse_time(&row, "created_at")?,
            });
        }

        Ok(records)
    }

    async fn log_message(&self, log: &MessageLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO message_logs
                (id, employee_id, direction, message_type, message_content, sent_at, attempt_number)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(log.id.to_string())
        .bind(log.employee_id.as_str())
        .bind(match log.direction {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
        })
        .bind(&log.message_type)
        .bind(&log.content)
        .bind(log.sent_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .bind(i64::from(log.attempt_number))
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(())
    }

    async fn recent_messages(&self, employee: &EmployeeId, limit: usize) -> Result<Vec<MessageLog>> {
        let rows = sqlx::query(
            "SELECT * FROM message_logs WHERE employee_id = ? ORDER BY sent_at DESC, id DESC LIMIT ?",
        )
        .bind(employee.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;

        rows.iter().map(Self::message_from_row).collect()
    }
}

fn database(e: sqlx::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

fn unavailable(e: sqlx::Error) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

fn parse_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column).map_err(database)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Other(format!("bad timestamp in {}: {}", column, e)))
}

fn parse_date(row: &SqliteRow, column: &str) -> Result<NaiveDate> {
    let raw: String = row.try_get(column).map_err(database)?;
    raw.parse()
        .map_err(|e| StorageError::Other(format!("bad date in {}: {}", column, e)))
}
