//! Planned versus completed task comparison.

use std::collections::BTreeSet;

use standup_core::{CompletionMetrics, TaskRecord};

/// Share of planned tasks that must be completed to be on track.
pub const ON_TRACK_RATIO: f64 = 0.8;

/// Compare planned and completed task names.
///
/// Both lists are treated as sets, so duplicates and ordering have no
/// effect. An empty plan gives a zero rate and is never on track.
pub fn compare<S: AsRef<str>>(planned: &[S], completed: &[S]) -> CompletionMetrics {
    let planned: BTreeSet<&str> = planned.iter().map(AsRef::as_ref).collect();
    let completed: BTreeSet<&str> = completed.iter().map(AsRef::as_ref).collect();

    if planned.is_empty() {
        return CompletionMetrics {
            total_completed: completed.len(),
            additional_tasks: completed.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
    }

    let total_planned = planned.len();
    let total_completed = completed.len();

    CompletionMetrics {
        total_planned,
        total_completed,
        completion_rate: total_completed as f64 / total_planned as f64,
        incomplete_tasks: planned.difference(&completed).map(|t| t.to_string()).collect(),
        additional_tasks: completed.difference(&planned).map(|t| t.to_string()).collect(),
        on_track: total_completed as f64 >= ON_TRACK_RATIO * total_planned as f64,
    }
}

/// Compare the two lists of one record.
pub fn compare_record(record: &TaskRecord) -> CompletionMetrics {
    compare(&record.tasks_planned, &record.tasks_completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_inputs() {
        let metrics = compare::<&str>(&[], &[]);
        assert_eq!(metrics.completion_rate, 0.0);
        assert!(!metrics.on_track);
        assert!(metrics.incomplete_tasks.is_empty());
        assert!(metrics.additional_tasks.is_empty());
    }

    #[test]
    fn test_partial_completion() {
        let metrics = compare(&["A", "B"], &["A"]);
        assert_eq!(metrics.completion_rate, 0.5);
        assert_eq!(metrics.incomplete_tasks, set(&["B"]));
        assert!(metrics.additional_tasks.is_empty());
        assert!(!metrics.on_track);
    }

    #[test]
    fn test_extra_work_exceeds_plan() {
        let metrics = compare(&["A"], &["A", "B"]);
        assert_eq!(metrics.completion_rate, 2.0);
        assert_eq!(metrics.additional_tasks, set(&["B"]));
        assert!(metrics.on_track);
    }

    #[test]
    fn test_empty_plan_is_never_on_track() {
        let metrics = compare(&[], &["A", "B"]);
        assert_eq!(metrics.completion_rate, 0.0);
        assert_eq!(metrics.total_completed, 2);
        assert_eq!(metrics.additional_tasks, set(&["A", "B"]));
        assert!(!metrics.on_track);
    }

    #[test]
    fn test_on_track_boundary() {
        // 4 of 5 is exactly 80%
        let metrics = compare(&["A", "B", "C", "D", "E"], &["A", "B", "C", "D"]);
        assert!(metrics.on_track);
        let metrics = compare(&["A", "B", "C", "D", "E"], &["A", "B", "C"]);
        assert!(!metrics.on_track);
    }

    #[test]
    fn test_duplicates_collapse() {
        let metrics = compare(&["A", "A", "B"], &["A", "A"]);
        assert_eq!(metrics.total_planned, 2);
        assert_eq!(metrics.total_completed, 1);
        assert_eq!(metrics.completion_rate, 0.5);
    }

    #[test]
    fn test_order_does_not_matter() {
        let planned = ["A", "B", "C"];
        let completed = ["C", "D", "A"];
        let forward = compare(&planned, &completed);

        let mut planned_rev = planned;
        planned_rev.reverse();
        let mut completed_rev = completed;
        completed_rev.reverse();

        assert_eq!(forward, compare(&planned_rev, &completed_rev));
    }
}
