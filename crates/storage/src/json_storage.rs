//! JSON file storage implementation.
//!
//! Stores data as JSON files under a root directory (`.standup` by default):
//! one file per employee, one file per employee-day, and one file per
//! feedback record or message. Feedback and message files are prefixed with
//! their timestamp, so listing a directory in name order is listing it in
//! creation order.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use standup_core::{
    DailyTask, Employee, EmployeeId, FeedbackId, FeedbackReceipt, FeedbackRecord, FeedbackType,
    MessageLog, TaskRecord,
};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::trait_::to_record;
use super::{FeedbackSink, HistoryStore, Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage, creating the subdirectories it needs.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("employees")).await?;
        fs::create_dir_all(root.join("daily_tasks")).await?;
        fs::create_dir_all(root.join("ai_feedback")).await?;
        fs::create_dir_all(root.join("message_logs")).await?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn employee_path(&self, id: &EmployeeId) -> PathBuf {
        self.root.join("employees").join(format!("{}.json", file_stem(id.as_str())))
    }
    fn daily_task_dir(&self, id: &EmployeeId) -> PathBuf {
        self.root.join("daily_tasks").join(file_stem(id.as_str()))
    }
    fn daily_task_path(&self, id: &EmployeeId, day: NaiveDate) -> PathBuf {
        self.daily_task_dir(id).join(format!("{}.json", day))
    }
    fn feedback_path(&self, record: &FeedbackRecord) -> PathBuf {
        self.root
            .join("ai_feedback")
            .join(format!("{}-{}.json", sortable(record.created_at), record.id))
    }
    fn message_path(&self, log: &MessageLog) -> PathBuf {
        self.root
            .join("message_logs")
            .join(format!("{}-{}.json", sortable(log.sent_at), log.id))
    }

    async fn ensure_employee(&self, id: &EmployeeId) -> Result<()> {
        if fs::try_exists(self.employee_path(id)).await? {
            Ok(())
        } else {
            Err(StorageError::UnknownEmployee(id.clone()))
        }
    }
}

#[async_trait]
impl HistoryStore for JsonStorage {
    async fn get_history(
        &self,
        employee: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TaskRecord>> {
        self.ensure_employee(employee).await?;

        let dir = self.daily_task_dir(employee);
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut rows: Vec<DailyTask> = list_dir(&dir).await?;
        rows.retain(|row| start <= row.task_date && row.task_date <= end);
        rows.sort_by_key(|row| row.task_date);

        debug!(employee = %employee, %start, %end, rows = rows.len(), "Loaded task history");

        Ok(rows.iter().map(to_record).collect())
    }
}

#[async_trait]
impl FeedbackSink for JsonStorage {
    async fn store(
        &self,
        employee: &EmployeeId,
        feedback_type: FeedbackType,
        content: &serde_json::Value,
    ) -> Result<FeedbackReceipt> {
        let record = FeedbackRecord {
            id: FeedbackId::new(),
            employee_id: employee.clone(),
            feedback_type,
            content: content.clone(),
            created_at: chrono::Utc::now(),
        };

        let json = serde_json::to_string_pretty(&record)?;
        let _guard = self.write_lock.lock().await;
        fs::write(self.feedback_path(&record), json.as_bytes()).await?;

        Ok(FeedbackReceipt {
            id: record.id,
            stored_at: record.created_at,
        })
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn save_employee(&self, employee: &Employee) -> Result<()> {
        let json = serde_json::to_string_pretty(employee)?;
        let _guard = self.write_lock.lock().await;
        fs::write(self.employee_path(&employee.id), json.as_bytes()).await?;
        Ok(())
    }

    async fn load_employee(&self, id: &EmployeeId) -> Result<Option<Employee>> {
        read_json(&self.employee_path(id)).await
    }

    async fn list_employees(&self) -> Result<Vec<Employee>> {
        let mut employees: Vec<Employee> = list_dir(&self.root.join("employees")).await?;
        employees.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(employees)
    }

    async fn save_daily_task(&self, task: &DailyTask) -> Result<()> {
        self.ensure_employee(&task.employee_id).await?;

        let json = serde_json::to_string_pretty(task)?;
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(self.daily_task_dir(&task.employee_id)).await?;
        fs::write(
            self.daily_task_path(&task.employee_id, task.task_date),
            json.as_bytes(),
        )
        .await?;
        Ok(())
    }

    async fn load_daily_task(&self, employee: &EmployeeId, day: NaiveDate) -> Result<Option<DailyTask>> {
        read_json(&self.daily_task_path(employee, day)).await
    }

    async fn list_feedback(&self, employee: &EmployeeId) -> Result<Vec<FeedbackRecord>> {
        let all: Vec<FeedbackRecord> = list_dir(&self.root.join("ai_feedback")).await?;
        Ok(all.into_iter().filter(|r| &r.employee_id == employee).collect())
    }

    async fn log_message(&self, log: &MessageLog) -> Result<()> {
        let json = serde_json::to_string_pretty(log)?;
        let _guard = self.write_lock.lock().await;
        fs::write(self.message_path(log), json.as_bytes()).await?;
        Ok(())
    }

    async fn recent_messages(&self, employee: &EmployeeId, limit: usize) -> Result<Vec<MessageLog>> {
        let mut logs: Vec<MessageLog> = list_dir(&self.root.join("message_logs")).await?;
        logs.retain(|l| &l.employee_id == employee);
        logs.reverse();
        logs.truncate(limit);
        Ok(logs)
    }
}

/// Zero-padded timestamp that sorts lexically in time order.
fn sortable(at: chrono::DateTime<chrono::Utc>) -> String {
    format!("{:020}", at.timestamp_nanos_opt().unwrap_or_default())
}

/// Make an id safe to use as a file name.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read every `.json` file of a directory in file name order.
///
/// Files that fail to parse are logged and skipped.
async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut paths = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
        }
    }
    Ok(items)
}
