//! Sends check-ins, feedback, reminders and reports to employees.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use standup_core::{EmployeeId, InsightResult, MessageLog, TimeWindow};
use standup_insight::InsightPipeline;
use standup_storage::{Storage, StorageError};
use tracing::{info, instrument, warn};

use crate::composer::{weekly_report, MessageComposer, MessageKind, DAILY_REMINDER, WEEKLY_REPORT_FALLBACK};
use crate::whatsapp::{DeliveryError, MessageSender, SentMessage};

/// Errors raised while notifying an employee.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The employee is not registered
    #[error("Unknown employee: {0}")]
    UnknownEmployee(EmployeeId),

    /// The employee is inactive
    #[error("Employee {0} is inactive")]
    Inactive(EmployeeId),

    /// Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Delivery error
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Delivers employee-facing messages and logs them.
pub struct Notifier {
    storage: Arc<dyn Storage>,
    sender: Arc<dyn MessageSender>,
    composer: MessageComposer,
    pipeline: Option<Arc<InsightPipeline>>,
}

impl Notifier {
    /// Create a notifier without insight personalization.
    pub fn new(storage: Arc<dyn Storage>, sender: Arc<dyn MessageSender>, composer: MessageComposer) -> Self {
        Self {
            storage,
            sender,
            composer,
            pipeline: None,
        }
    }

    /// Use `pipeline` to personalize messages and build reports.
    pub fn with_pipeline(mut self, pipeline: Arc<InsightPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Send the morning request for updates.
    #[instrument(skip(self, window))]
    pub async fn send_morning_check_in(
        &self,
        employee: &EmployeeId,
        window: &TimeWindow,
    ) -> Result<SentMessage, NotifyError> {
        let insight = self.insight_for(employee, window).await;
        let body = self
            .composer
            .compose(&MessageKind::MorningCheckIn, insight.as_ref(), None)
            .await;
        self.deliver(employee, &MessageKind::MorningCheckIn.key().to_string(), &body)
            .await
    }

    /// Send feedback on recent performance.
    #[instrument(skip(self, window, context))]
    pub async fn send_performance_feedback(
        &self,
        employee: &EmployeeId,
        window: &TimeWindow,
        context: Option<&JsonValue>,
    ) -> Result<SentMessage, NotifyError> {
        let insight = self.insight_for(employee, window).await;
        let body = self
            .composer
            .compose(&MessageKind::PerformanceFeedback, insight.as_ref(), context)
            .await;
        self.deliver(employee, &MessageKind::PerformanceFeedback.key().to_string(), &body)
            .await
    }

    /// Send the plain daily reminder.
    #[instrument(skip(self))]
    pub async fn send_daily_reminder(&self, employee: &EmployeeId) -> Result<SentMessage, NotifyError> {
        self.deliver(employee, "daily_updates/reminder", DAILY_REMINDER).await
    }

    /// Send the weekly report, or [`WEEKLY_REPORT_FALLBACK`] when no insight
    /// can be computed.
    #[instrument(skip(self, window))]
    pub async fn send_weekly_report(
        &self,
        employee: &EmployeeId,
        window: &TimeWindow,
    ) -> Result<SentMessage, NotifyError> {
        if self.pipeline.is_none() {
            warn!("No insight pipeline configured, sending static report");
        }
        let body = match self.insight_for(employee, window).await {
            Some(insight) => weekly_report(&insight),
            None => WEEKLY_REPORT_FALLBACK.to_string(),
        };
        self.deliver(employee, "reports/weekly", &body).await
    }

    /// Send `body` to the employee's WhatsApp number and log it.
    pub async fn deliver(
        &self,
        employee: &EmployeeId,
        message_type: &str,
        body: &str,
    ) -> Result<SentMessage, NotifyError> {
        let record = self
            .storage
            .load_employee(employee)
            .await?
            .ok_or_else(|| NotifyError::UnknownEmployee(employee.clone()))?;
        if !record.is_active() {
            return Err(NotifyError::Inactive(employee.clone()));
        }

        let sent = self.sender.send_text(&record.whatsapp_number, body).await?;

        let log = MessageLog::outbound(employee.clone(), message_type, body);
        if let Err(e) = self.storage.log_message(&log).await {
            warn!(error = %e, "Message sent but not logged");
        }

        info!(employee = %employee, message_type, "Message delivered");
        Ok(sent)
    }

    async fn insight_for(&self, employee: &EmployeeId, window: &TimeWindow) -> Option<InsightResult> {
        let pipeline = self.pipeline.as_ref()?;
        match pipeline.run(employee, window).await {
            Ok(outcome) => Some(outcome.into_insight()),
            Err(e) => {
                warn!(error = %e, "Insight unavailable, using static message");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use standup_core::{DailyTask, Employee, EmployeeStatus, MessageDirection, QualityScore, TaskRecord};
    use standup_quality::{EvaluationContext, QualityEvaluator};
    use standup_storage::{HistoryStore, JsonStorage};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_text(&self, to: &str, body: &str) -> crate::whatsapp::Result<SentMessage> {
            if self.fail {
                return Err(DeliveryError::Status {
                    status: 503,
                    body: "down".into(),
                });
            }
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(SentMessage {
                id: Some("m1".into()),
                response: JsonValue::Null,
            })
        }

        async fn mark_read(&self, _message_id: &str) -> crate::whatsapp::Result<()> {
            Ok(())
        }
    }

    struct FixedEvaluator;

    #[async_trait]
    impl QualityEvaluator for FixedEvaluator {
        async fn evaluate(&self, _: &str, _: &EvaluationContext) -> standup_quality::Result<QualityScore> {
            Ok(QualityScore::with_average(8.0))
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryStore for BrokenHistory {
        async fn get_history(
            &self,
            _: &EmployeeId,
            _: NaiveDate,
            _: NaiveDate,
        ) -> standup_storage::Result<Vec<TaskRecord>> {
            Err(StorageError::Unavailable("database is locked".into()))
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(day(1), day(7), Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap())
    }

    async fn setup() -> (TempDir, Arc<JsonStorage>, Employee) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonStorage::new(dir.path()).await.unwrap());
        let employee = Employee::new("Asha", "919800000001");
        storage.save_employee(&employee).await.unwrap();
        (dir, storage, employee)
    }

    fn pipeline(storage: &Arc<JsonStorage>) -> Arc<InsightPipeline> {
        Arc::new(InsightPipeline::new(
            storage.clone(),
            Arc::new(FixedEvaluator),
            storage.clone(),
        ))
    }

    #[tokio::test]
    async fn test_reminder_is_sent_and_logged() {
        let (_dir, storage, employee) = setup().await;
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(storage.clone(), sender.clone(), MessageComposer::new(Default::default()));

        notifier.send_daily_reminder(&employee.id).await.unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0], ("919800000001".to_string(), DAILY_REMINDER.to_string()));

        let logs = storage.recent_messages(&employee.id, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].direction, MessageDirection::Outbound);
        assert_eq!(logs[0].message_type, "daily_updates/reminder");
    }

    #[tokio::test]
    async fn test_morning_check_in_without_model_uses_template() {
        let (_dir, storage, employee) = setup().await;
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(storage.clone(), sender.clone(), MessageComposer::new(Default::default()))
            .with_pipeline(pipeline(&storage));

        notifier.send_morning_check_in(&employee.id, &window()).await.unwrap();

        assert!(sender.sent.lock().unwrap()[0].1.starts_with("Good morning!"));
    }

    #[tokio::test]
    async fn test_weekly_report_uses_insight() {
        let (_dir, storage, employee) = setup().await;
        storage
            .save_daily_task(&DailyTask::planned(employee.id.clone(), day(2), "A\nB").complete("A"))
            .await
            .unwrap();
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(storage.clone(), sender.clone(), MessageComposer::new(Default::default()))
            .with_pipeline(pipeline(&storage));

        notifier.send_weekly_report(&employee.id, &window()).await.unwrap();

        let body = sender.sent.lock().unwrap()[0].1.clone();
        assert!(body.starts_with("Weekly Performance Summary:\nCompletion Rate: 50%"));
        assert!(body.contains("- Consider breaking down tasks into smaller, manageable chunks"));
        // The run also stored the insight
        assert_eq!(storage.list_feedback(&employee.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_weekly_report_without_pipeline_sends_fallback() {
        let (_dir, storage, employee) = setup().await;
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(storage.clone(), sender.clone(), MessageComposer::new(Default::default()));

        notifier.send_weekly_report(&employee.id, &window()).await.unwrap();

        assert_eq!(sender.sent.lock().unwrap()[0].1, WEEKLY_REPORT_FALLBACK);
        let logs = storage.recent_messages(&employee.id, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message_type, "reports/weekly");
        assert_eq!(logs[0].content, WEEKLY_REPORT_FALLBACK);
    }

    #[tokio::test]
    async fn test_weekly_report_falls_back_when_insight_fails() {
        let (_dir, storage, employee) = setup().await;
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(storage.clone(), sender.clone(), MessageComposer::new(Default::default()))
            .with_pipeline(Arc::new(InsightPipeline::new(
                Arc::new(BrokenHistory),
                Arc::new(FixedEvaluator),
                storage.clone(),
            )));

        notifier.send_weekly_report(&employee.id, &window()).await.unwrap();

        assert_eq!(sender.sent.lock().unwrap()[0].1, WEEKLY_REPORT_FALLBACK);
        assert!(storage.list_feedback(&employee.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_employees() {
        let (_dir, storage, mut employee) = setup().await;
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(storage.clone(), sender.clone(), MessageComposer::new(Default::default()));

        let err = notifier.send_daily_reminder(&EmployeeId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, NotifyError::UnknownEmployee(_)));

        employee.status = EmployeeStatus::Inactive;
        storage.save_employee(&employee).await.unwrap();
        let err = notifier.send_daily_reminder(&employee.id).await.unwrap_err();
        assert!(matches!(err, NotifyError::Inactive(_)));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_logged() {
        let (_dir, storage, employee) = setup().await;
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..Default::default()
        });
        let notifier = Notifier::new(storage.clone(), sender, MessageComposer::new(Default::default()));

        let err = notifier.send_daily_reminder(&employee.id).await.unwrap_err();
        assert!(matches!(err, NotifyError::Delivery(_)));
        assert!(storage.recent_messages(&employee.id, 10).await.unwrap().is_empty());
    }
}
