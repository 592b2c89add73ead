//! Human-readable summaries of a processed batch.

use orchestrator::ResultBundle;
use serde_json::{json, Value};
use std::fmt::Write as _;

/// Comment text summarising a batch for the issue it came from.
#[must_use]
pub fn format_status_report(bundle: &ResultBundle) -> String {
    let mut report = String::new();

    let _ = writeln!(report, "Processed {} tasks:", bundle.total());
    let _ = writeln!(
        report,
        "- {} tasks completed successfully",
        bundle.success_count()
    );
    let _ = writeln!(report, "- {} tasks failed", bundle.failed_count());
    report.push('\n');

    if bundle.warning_count() > 0 {
        report.push_str("Tasks completed with warnings:\n");
        for outcome in bundle.success.iter().filter(|o| o.is_warning()) {
            let _ = writeln!(
                report,
                "- {}: {}",
                outcome.task.type_label(),
                outcome.warning.as_deref().unwrap_or_default()
            );
        }
    }

    if !bundle.failed.is_empty() {
        report.push_str("Failed tasks:\n");
        for outcome in &bundle.failed {
            let _ = writeln!(
                report,
                "- Task: {} ({})\n  Error: {}",
                outcome.task.type_label(),
                outcome.task.description,
                outcome.error.as_deref().unwrap_or("Unknown error")
            );
        }
    }

    report
}

/// `"{type}: {error}"` for every failed task, joined by `", "`.
#[must_use]
pub fn failure_description(bundle: &ResultBundle) -> String {
    bundle
        .failure_summary()
        .into_iter()
        .map(|(task_type, error)| format!("{task_type}: {error}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One-line completion summary used for the `task_completed` event.
#[must_use]
pub fn completion_summary(bundle: &ResultBundle, subject: Option<&str>) -> String {
    let scope = subject.map(|s| format!(" for issue {s}")).unwrap_or_default();
    let mut summary = format!(
        "Task processing complete{scope}. Success: {}, Failed: {}",
        bundle.success_count(),
        bundle.failed_count()
    );
    if !bundle.all_succeeded() {
        let _ = write!(summary, ". Failures: {}", failure_description(bundle));
    }
    summary
}

/// Structured counterpart of [`completion_summary`].
#[must_use]
pub fn completion_event_data(bundle: &ResultBundle) -> Value {
    let mut data = json!({
        "success_count": bundle.success_count(),
        "failed_count": bundle.failed_count(),
        "warning_count": bundle.warning_count(),
    });
    if !bundle.all_succeeded() {
        data["failure_details"] = bundle
            .failure_summary()
            .into_iter()
            .map(|(task_type, error)| json!({"task_type": task_type, "error": error}))
            .collect();
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator::{
        AgentResponse, AgentStatus, Task, TaskOutcome, TaskType, AGENT_UNAVAILABLE,
        MISSING_AGENT_TYPE,
    };

    fn mixed_bundle() -> ResultBundle {
        ResultBundle::from_outcomes(vec![
            TaskOutcome::success(
                0,
                Task::new(TaskType::Ci, "Build pipeline"),
                AgentResponse::new(AgentStatus::Success, "ok"),
            ),
            TaskOutcome::warning(
                1,
                Task::new(TaskType::Helm, "Chart for web"),
                AgentResponse::new(AgentStatus::Warning, "no resource limits"),
            ),
            TaskOutcome::failed(
                2,
                Task::new(TaskType::Deploy, "Ship to staging"),
                None,
                AGENT_UNAVAILABLE,
            ),
            TaskOutcome::failed(3, Task::default(), None, MISSING_AGENT_TYPE),
        ])
    }

    #[test]
    fn test_status_report() {
        let expected = "Processed 4 tasks:\n\
- 2 tasks completed successfully\n\
- 2 tasks failed\n\
\n\
Tasks completed with warnings:\n\
- helm: no resource limits\n\
Failed tasks:\n\
- Task: deploy (Ship to staging)\n\
\x20 Error: Agent unavailable\n\
- Task: unknown ()\n\
\x20 Error: Missing agent type\n";
        assert_eq!(format_status_report(&mixed_bundle()), expected);
    }

    #[test]
    fn test_status_report_all_success() {
        let bundle = ResultBundle::from_outcomes(vec![TaskOutcome::success(
            0,
            Task::new(TaskType::Ci, "Build"),
            AgentResponse::new(AgentStatus::Success, "ok"),
        )]);
        assert_eq!(
            format_status_report(&bundle),
            "Processed 1 tasks:\n- 1 tasks completed successfully\n- 0 tasks failed\n\n"
        );
    }

    #[test]
    fn test_failure_description() {
        assert_eq!(
            failure_description(&mixed_bundle()),
            "deploy: Agent unavailable, unknown: Missing agent type"
        );
        assert_eq!(failure_description(&ResultBundle::default()), "");
    }

    #[test]
    fn test_completion_summary() {
        assert_eq!(
            completion_summary(&mixed_bundle(), Some("OPS-1")),
            "Task processing complete for issue OPS-1. Success: 2, Failed: 2. \
Failures: deploy: Agent unavailable, unknown: Missing agent type"
        );
        assert_eq!(
            completion_summary(&ResultBundle::default(), None),
            "Task processing complete. Success: 0, Failed: 0"
        );

        let data = completion_event_data(&mixed_bundle());
        assert_eq!(data["warning_count"], 1);
        assert_eq!(data["failure_details"][0]["task_type"], "deploy");
    }
}
