//! Trend aggregation over a window of task records.

use std::collections::HashMap;
use std::fmt::Display;

use standup_core::{QualityScore, TaskFrequency, TaskRecord, TrendDirection, TrendSummary};
use tracing::{debug, warn};

use crate::comparator::compare_record;

/// Number of entries kept in `common_tasks`.
pub const COMMON_TASK_LIMIT: usize = 5;

/// Frequency of completed task names, remembering first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatterns {
    counts: HashMap<String, usize>,
    order: Vec<String>,
}

impl TaskPatterns {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `task`.
    pub fn record(&mut self, task: &str) {
        match self.counts.get_mut(task) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(task.to_string(), 1);
                self.order.push(task.to_string());
            }
        }
    }

    /// Occurrences of `task`.
    pub fn get(&self, task: &str) -> usize {
        self.counts.get(task).copied().unwrap_or(0)
    }

    /// Number of distinct task names.
    pub fn distinct(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.order.iter().map(|task| (task.as_str(), self.get(task)))
    }

    /// The `limit` most frequent tasks, ties kept in first-seen order.
    pub fn top(&self, limit: usize) -> Vec<TaskFrequency> {
        let mut entries: Vec<TaskFrequency> = self
            .iter()
            .map(|(task, count)| TaskFrequency {
                task: task.to_string(),
                count,
            })
            .collect();
        // sort_by is stable
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries.truncate(limit);
        entries
    }
}

impl<'a> FromIterator<&'a str> for TaskPatterns {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut patterns = TaskPatterns::new();
        for task in iter {
            patterns.record(task);
        }
        patterns
    }
}

/// Everything produced while aggregating one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// The trend summary
    pub summary: TrendSummary,

    /// Scores of processed records, chronological
    pub quality_scores: Vec<QualityScore>,

    /// Completed task frequencies of processed records
    pub task_patterns: TaskPatterns,

    /// Records skipped because their quality lookup failed
    pub skipped: usize,
}

/// Aggregate records into a [`TrendSummary`].
///
/// `quality_lookup` receives each record with its index. A failed lookup
/// skips the record entirely: it contributes no completion rate, no
/// quality score and no task counts. Records must be in chronological
/// order. An empty input gives an all-zero summary.
pub fn aggregate<E, F>(records: &[TaskRecord], mut quality_lookup: F) -> Aggregation
where
    E: Display,
    F: FnMut(usize, &TaskRecord) -> Result<QualityScore, E>,
{
    let mut rates = Vec::with_capacity(records.len());
    let mut quality_scores = Vec::with_capacity(records.len());
    let mut task_patterns = TaskPatterns::new();
    let mut skipped = 0;

    for (index, record) in records.iter().enumerate() {
        let metrics = compare_record(record);

        let score = match quality_lookup(index, record) {
            Ok(score) => score,
            Err(e) => {
                warn!(date = %record.task_date, error = %e, "Quality evaluation failed, skipping record");
                skipped += 1;
                continue;
            }
        };

        rates.push(metrics.completion_rate);
        quality_scores.push(score);
        for task in &record.tasks_completed {
            task_patterns.record(task);
        }
    }

    let completion_rate_trend = if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    };

    // A lone record compares with itself and so reads as declining.
    let trend_direction = match (rates.first(), rates.last()) {
        (Some(first), Some(last)) if last > first => TrendDirection::Improving,
        _ => TrendDirection::Declining,
    };

    debug!(
        processed = rates.len(),
        skipped,
        completion_rate_trend,
        "Trend aggregated"
    );

    Aggregation {
        summary: TrendSummary {
            completion_rate_trend,
            quality_trend: quality_scores.clone(),
            trend_direction,
            common_tasks: task_patterns.top(COMMON_TASK_LIMIT),
        },
        quality_scores,
        task_patterns,
        skipped,
    }
}
