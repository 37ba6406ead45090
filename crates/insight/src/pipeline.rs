//! Insight pipeline: history, aggregation, recommendations, persistence.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use standup_core::{
    EmployeeId, FeedbackReceipt, FeedbackType, InsightResult, QualityScore, TaskRecord, TimeWindow,
};
use standup_quality::{EvaluationContext, EvaluationError, QualityEvaluator};
use standup_storage::{FeedbackSink, HistoryStore, StorageError};
use tracing::{error, info, instrument, warn};

use crate::recommend::RecommendationEngine;
use crate::trend::aggregate;

/// Run-level failures. Nothing was computed.
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    /// History could not be read
    #[error("History unavailable: {0}")]
    DataUnavailable(#[source] StorageError),

    /// History fetch exceeded the call timeout
    #[error("History fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a computed insight was not persisted.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The sink rejected the write
    #[error("Store failed: {0}")]
    Storage(#[from] StorageError),

    /// The insight could not be encoded
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The sink did not answer in time
    #[error("Store timed out after {0:?}")]
    Timeout(Duration),
}

/// Result of a run that computed an insight.
#[derive(Debug)]
pub enum InsightOutcome {
    /// Computed and stored
    Stored {
        /// The insight
        insight: InsightResult,
        /// Sink acknowledgement
        receipt: FeedbackReceipt,
    },

    /// Computed, but the store failed
    StoreFailed {
        /// The insight
        insight: InsightResult,
        /// Store failure
        error: PersistenceError,
    },
}

impl InsightOutcome {
    /// The computed insight.
    pub fn insight(&self) -> &InsightResult {
        match self {
            InsightOutcome::Stored { insight, .. } | InsightOutcome::StoreFailed { insight, .. } => insight,
        }
    }

    /// Take the computed insight.
    pub fn into_insight(self) -> InsightResult {
        match self {
            InsightOutcome::Stored { insight, .. } | InsightOutcome::StoreFailed { insight, .. } => insight,
        }
    }

    /// Whether the insight was persisted.
    pub fn is_stored(&self) -> bool {
        matches!(self, InsightOutcome::Stored { .. })
    }
}

/// Configuration for the insight pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Evaluations in flight at once for one run
    pub max_concurrent_evaluations: usize,

    /// Timeout applied to each external call
    pub call_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_evaluations: 4,
            call_timeout: None,
        }
    }
}

/// Produces and persists an [`InsightResult`] for one employee and window.
pub struct InsightPipeline {
    history: Arc<dyn HistoryStore>,
    evaluator: Arc<dyn QualityEvaluator>,
    sink: Arc<dyn FeedbackSink>,
    engine: RecommendationEngine,
    config: PipelineConfig,
}

impl InsightPipeline {
    /// Create a pipeline with the default rules.
    pub fn new(
        history: Arc<dyn HistoryStore>,
        evaluator: Arc<dyn QualityEvaluator>,
        sink: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            history,
            evaluator,
            sink,
            engine: RecommendationEngine::default(),
            config: PipelineConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the recommendation rules.
    pub fn with_engine(mut self, engine: RecommendationEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Generate an insight for `employee` over `window`.
    ///
    /// `window.as_of` becomes `generated_at`. A store failure still returns
    /// the computed insight as [`InsightOutcome::StoreFailed`].
    #[instrument(skip_all, fields(employee = %employee, start = %window.start, end = %window.end))]
    pub async fn run(&self, employee: &EmployeeId, window: &TimeWindow) -> Result<InsightOutcome, InsightError> {
        let records = match self
            .within(self.history.get_history(employee, window.start, window.end))
            .await
        {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to load history");
                return Err(InsightError::DataUnavailable(e));
            }
            Err(after) => {
                error!(?after, "History fetch timed out");
                return Err(InsightError::Timeout(after));
            }
        };

        let evaluations = self.evaluate_all(employee, &records).await;
        let aggregation = aggregate(&records, |index, _| match &evaluations[index] {
            Ok(score) => Ok(score.clone()),
            Err(e) => Err(e.to_string()),
        });

        let recommendations = self.engine.recommend(
            &aggregation.summary,
            &aggregation.quality_scores,
            &aggregation.task_patterns,
        );

        let insight = InsightResult {
            employee_id: employee.clone(),
            trend_summary: aggregation.summary,
            recommendations,
            generated_at: window.as_of,
        };

        info!(
            records = records.len(),
            skipped = aggregation.skipped,
            recommendations = insight.recommendations.len(),
            "Insight computed"
        );

        match self.persist(employee, &insight).await {
            Ok(receipt) => Ok(InsightOutcome::Stored { insight, receipt }),
            Err(error) => {
                warn!(error = %error, "Failed to store insight");
                Ok(InsightOutcome::StoreFailed { insight, error })
            }
        }
    }

    /// Score every record concurrently, results in record order.
    async fn evaluate_all(
        &self,
        employee: &EmployeeId,
        records: &[TaskRecord],
    ) -> Vec<Result<QualityScore, EvaluationError>> {
        stream::iter(records.iter().map(|record| self.evaluate(employee, record)))
            .buffered(self.config.max_concurrent_evaluations.max(1))
            .collect()
            .await
    }

    async fn evaluate(&self, employee: &EmployeeId, record: &TaskRecord) -> Result<QualityScore, EvaluationError> {
        let context = EvaluationContext::new(employee.clone(), record.task_date);
        let text = record.completed_text();

        match self.within(self.evaluator.evaluate(&text, &context)).await {
            Ok(result) => result,
            Err(after) => Err(EvaluationError::Timeout(after)),
        }
    }

    async fn persist(&self, employee: &EmployeeId, insight: &InsightResult) -> Result<FeedbackReceipt, PersistenceError> {
        let content = serde_json::to_value(insight)?;
        match self
            .within(self.sink.store(employee, FeedbackType::PerformanceInsights, &content))
            .await
        {
            Ok(result) => Ok(result?),
            Err(after) => Err(PersistenceError::Timeout(after)),
        }
    }

    /// Apply the call timeout, returning the limit when it elapses.
    async fn within<F: Future>(&self, call: F) -> Result<F::Output, Duration> {
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| limit),
            None => Ok(call.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Datelike, NaiveDate, TimeZone, Utc};
    use standup_core::{FeedbackId, RecommendationArea, TaskFrequency, TrendDirection};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(day(1), day(7), Utc.with_ymd_and_hms(2024, 3, 7, 18, 0, 0).unwrap())
    }

    struct MockHistory {
        records: HashMap<EmployeeId, Vec<TaskRecord>>,
        delay: Option<Duration>,
    }

    impl MockHistory {
        fn with(employee: &str, records: Vec<TaskRecord>) -> Arc<Self> {
            Arc::new(Self {
                records: HashMap::from([(EmployeeId::from(employee), records)]),
                delay: None,
            })
        }
    }

    #[async_trait]
    impl HistoryStore for MockHistory {
        async fn get_history(
            &self,
            employee: &EmployeeId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> standup_storage::Result<Vec<TaskRecord>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let records = self
                .records
                .get(employee)
                .ok_or_else(|| StorageError::UnknownEmployee(employee.clone()))?;
            Ok(records
                .iter()
                .filter(|r| r.task_date >= start && r.task_date <= end)
                .cloned()
                .collect())
        }
    }

    /// Scores by the number of completed lines; fails on text containing "fail".
    /// Earlier records finish later so completion order differs from input order.
    struct MockEvaluator {
        calls: Mutex<usize>,
        hang_on: Option<String>,
    }

    impl MockEvaluator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(0),
                hang_on: None,
            })
        }
    }

    #[async_trait]
    impl QualityEvaluator for MockEvaluator {
        async fn evaluate(
            &self,
            response_text: &str,
            context: &EvaluationContext,
        ) -> standup_quality::Result<QualityScore> {
            *self.calls.lock().unwrap() += 1;
            if self.hang_on.as_deref() == Some(response_text) {
                std::future::pending::<()>().await;
            }
            let delay = 40u64.saturating_sub(u64::from(context.task_date.day()) * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if response_text.contains("fail") {
                return Err(EvaluationError::Malformed("no scores".into()));
            }
            let lines = response_text.lines().count() as f64;
            Ok(QualityScore::with_average(lines * 4.0))
        }
    }

    #[derive(Default)]
    struct MockSink {
        stored: Mutex<Vec<(EmployeeId, FeedbackType, serde_json::Value)>>,
        fail: bool,
    }

    #[async_trait]
    impl FeedbackSink for MockSink {
        async fn store(
            &self,
            employee: &EmployeeId,
            feedback_type: FeedbackType,
            content: &serde_json::Value,
        ) -> standup_storage::Result<FeedbackReceipt> {
            if self.fail {
                return Err(StorageError::Unavailable("disk full".into()));
            }
            self.stored
                .lock()
                .unwrap()
                .push((employee.clone(), feedback_type, content.clone()));
            Ok(FeedbackReceipt {
                id: FeedbackId::new(),
                stored_at: Utc::now(),
            })
        }
    }

    fn two_day_history() -> Vec<TaskRecord> {
        vec![
            TaskRecord::new(day(1), ["A", "B"], ["A"]),
            TaskRecord::new(day(2), ["A"], ["A", "C"]),
        ]
    }

    #[tokio::test]
    async fn test_end_to_end_two_days() {
        let sink = Arc::new(MockSink::default());
        let pipeline = InsightPipeline::new(
            MockHistory::with("E1", two_day_history()),
            MockEvaluator::new(),
            sink.clone(),
        );

        let outcome = pipeline.run(&EmployeeId::from("E1"), &window()).await.unwrap();
        assert!(outcome.is_stored());

        let insight = outcome.insight();
        let summary = &insight.trend_summary;
        assert_eq!(summary.completion_rate_trend, 1.25);
        assert_eq!(summary.trend_direction, TrendDirection::Improving);
        assert_eq!(summary.common_tasks[0], TaskFrequency { task: "A".into(), count: 2 });
        assert_eq!(summary.common_tasks[1], TaskFrequency { task: "C".into(), count: 1 });
        assert_eq!(insight.generated_at, window().as_of);

        // Scores 4.0 then 8.0: the first is weak; only two distinct tasks.
        let areas: Vec<_> = insight.recommendations.iter().map(|r| r.area).collect();
        assert_eq!(
            areas,
            vec![RecommendationArea::ResponseQuality, RecommendationArea::TaskVariety]
        );

        let stored = sink.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1, FeedbackType::PerformanceInsights);
        assert_eq!(stored[0].2["trend_summary"]["trend_direction"], "improving");
    }

    #[tokio::test]
    async fn test_quality_trend_keeps_record_order() {
        let records = vec![
            TaskRecord::new(day(1), ["A"], ["A"]),
            TaskRecord::new(day(2), ["A"], ["A", "B"]),
            TaskRecord::new(day(3), ["A"], ["A", "B", "C"]),
        ];
        let pipeline = InsightPipeline::new(
            MockHistory::with("E1", records),
            MockEvaluator::new(),
            Arc::new(MockSink::default()),
        )
        .with_config(PipelineConfig {
            max_concurrent_evaluations: 3,
            call_timeout: None,
        });

        let outcome = pipeline.run(&EmployeeId::from("E1"), &window()).await.unwrap();
        let averages: Vec<_> = outcome
            .insight()
            .trend_summary
            .quality_trend
            .iter()
            .map(|s| s.average_score)
            .collect();
        assert_eq!(averages, vec![Some(4.0), Some(8.0), Some(12.0)]);
    }

    #[tokio::test]
    async fn test_failed_evaluation_skips_record() {
        let records = vec![
            TaskRecord::new(day(1), ["A"], ["A"]),
            TaskRecord::new(day(2), ["A", "B"], ["fail"]),
            TaskRecord::new(day(3), ["A", "B"], ["A", "B"]),
        ];
        let pipeline = InsightPipeline::new(
            MockHistory::with("E1", records),
            MockEvaluator::new(),
            Arc::new(MockSink::default()),
        );

        let outcome = pipeline.run(&EmployeeId::from("E1"), &window()).await.unwrap();
        let summary = &outcome.insight().trend_summary;
        assert_eq!(summary.quality_trend.len(), 2);
        assert_eq!(summary.completion_rate_trend, 1.0);
        assert!(summary.common_tasks.iter().all(|t| t.task != "fail"));
    }

    #[tokio::test]
    async fn test_unknown_employee_is_data_unavailable() {
        let sink = Arc::new(MockSink::default());
        let pipeline = InsightPipeline::new(
            MockHistory::with("E1", two_day_history()),
            MockEvaluator::new(),
            sink.clone(),
        );

        let err = pipeline.run(&EmployeeId::from("nobody"), &window()).await.unwrap_err();
        assert!(matches!(err, InsightError::DataUnavailable(StorageError::UnknownEmployee(_))));
        assert!(sink.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_window_still_stores() {
        let sink = Arc::new(MockSink::default());
        let evaluator = MockEvaluator::new();
        let pipeline = InsightPipeline::new(MockHistory::with("E1", Vec::new()), evaluator.clone(), sink.clone());

        let outcome = pipeline.run(&EmployeeId::from("E1"), &window()).await.unwrap();
        assert!(outcome.is_stored());
        assert_eq!(outcome.insight().trend_summary.completion_rate_trend, 0.0);
        assert_eq!(*evaluator.calls.lock().unwrap(), 0);
        assert_eq!(sink.stored.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_returns_insight() {
        let sink = Arc::new(MockSink {
            fail: true,
            ..Default::default()
        });
        let pipeline = InsightPipeline::new(
            MockHistory::with("E1", two_day_history()),
            MockEvaluator::new(),
            sink,
        );

        let outcome = pipeline.run(&EmployeeId::from("E1"), &window()).await.unwrap();
        assert!(!outcome.is_stored());
        match outcome {
            InsightOutcome::StoreFailed { insight, error } => {
                assert_eq!(insight.trend_summary.completion_rate_trend, 1.25);
                assert!(matches!(error, PersistenceError::Storage(StorageError::Unavailable(_))));
            }
            InsightOutcome::Stored { .. } => panic!("expected a store failure"),
        }
    }

    #[tokio::test]
    async fn test_history_timeout() {
        let history = Arc::new(MockHistory {
            records: HashMap::new(),
            delay: Some(Duration::from_secs(5)),
        });
        let pipeline = InsightPipeline::new(history, MockEvaluator::new(), Arc::new(MockSink::default()))
            .with_config(PipelineConfig {
                call_timeout: Some(Duration::from_millis(20)),
                ..Default::default()
            });

        let err = pipeline.run(&EmployeeId::from("E1"), &window()).await.unwrap_err();
        assert!(matches!(err, InsightError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_hung_evaluation_times_out_and_is_skipped() {
        let evaluator = Arc::new(MockEvaluator {
            calls: Mutex::new(0),
            hang_on: Some("A\nC".to_string()),
        });
        let pipeline = InsightPipeline::new(
            MockHistory::with("E1", two_day_history()),
            evaluator,
            Arc::new(MockSink::default()),
        )
        .with_config(PipelineConfig {
            call_timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        });

        let outcome = pipeline.run(&EmployeeId::from("E1"), &window()).await.unwrap();
        let summary = &outcome.insight().trend_summary;
        assert_eq!(summary.quality_trend.len(), 1);
        assert_eq!(summary.completion_rate_trend, 0.5);
        assert!(outcome.is_stored());
    }
}
