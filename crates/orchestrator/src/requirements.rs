//! Pre-flight parameter checks for tasks.
//!
//! Each task type has a fixed set of required parameters (a task missing any
//! of them is not dispatched) and suggested parameters (missing ones are
//! reported but do not block dispatch). The same field descriptions are used
//! for validation results and for the feedback text shown to the task author.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::models::{Task, TaskType};

/// Deficiency reported for a task whose type is absent or not routable.
pub const UNKNOWN_TASK_TYPE: &str = "Unknown task type";

/// Deficiency reported by [`TaskValidator::validate_tasks`] for a task with no `type` field.
pub const TASK_TYPE_REQUIRED: &str = "Task type is required";

/// Required and suggested parameter keys for one task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRequirements {
    /// Keys that must be present
    pub required: &'static [&'static str],
    /// Keys that improve the result when present
    pub suggested: &'static [&'static str],
}

impl TaskRequirements {
    /// Requirement table entry for a task type.
    #[must_use]
    pub const fn for_type(task_type: TaskType) -> Self {
        match task_type {
            TaskType::Ci => Self {
                required: &["repository"],
                suggested: &["branch", "build_steps"],
            },
            TaskType::Helm => Self {
                required: &["repository", "app_name"],
                suggested: &["namespace", "values"],
            },
            TaskType::Deploy => Self {
                required: &["repository", "namespace", "cluster_details"],
                suggested: &["helm_values", "release_name"],
            },
        }
    }
}

/// Human-readable meaning of a task parameter.
#[must_use]
pub fn parameter_description(field: &str) -> Option<&'static str> {
    let description = match field {
        "repository" => "Git repository URL (e.g., https://github.com/username/repo)",
        "branch" => "Git branch to use (e.g., main, develop)",
        "build_steps" => "List of build steps to include (e.g., test, lint, build)",
        "app_name" => "Name of the application for Helm chart",
        "namespace" => "Kubernetes namespace for deployment",
        "values" => "Custom values for the Helm chart",
        "cluster_details" => "Target Kubernetes cluster connection details",
        "helm_values" => "Values to override in the Helm chart",
        "release_name" => "Helm release name for deployment",
        _ => return None,
    };
    Some(description)
}

fn describe(field: &str, fallback: &str) -> String {
    format!("{field}: {}", parameter_description(field).unwrap_or(fallback))
}

/// Result of checking a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskValidation {
    /// All required parameters are present
    pub is_valid: bool,
    /// Descriptions of missing required parameters
    pub missing_required: Vec<String>,
    /// Descriptions of missing suggested parameters
    pub missing_suggested: Vec<String>,
}

/// Per-task entry of a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskValidationResult {
    /// Submission position
    pub task_index: usize,
    /// All required parameters are present
    pub is_valid: bool,
    /// Descriptions of missing required parameters
    pub missing_required: Vec<String>,
    /// Descriptions of missing suggested parameters
    pub missing_suggested: Vec<String>,
    /// The checked task
    pub task: Task,
}

/// Validation of a whole task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every task is valid
    pub is_valid: bool,
    /// One entry per task, in submission order
    pub task_results: Vec<TaskValidationResult>,
}

impl ValidationReport {
    /// Entries for tasks that failed validation.
    pub fn invalid_tasks(&self) -> impl Iterator<Item = &TaskValidationResult> {
        self.task_results.iter().filter(|r| !r.is_valid)
    }
}

/// Checks tasks against the requirement table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskValidator;

impl TaskValidator {
    /// Create a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Check one task's parameters against its type's requirements.
    #[must_use]
    pub fn validate_task(&self, task: &Task) -> TaskValidation {
        let Some(task_type) = task.kind() else {
            return TaskValidation {
                is_valid: false,
                missing_required: vec![UNKNOWN_TASK_TYPE.to_string()],
                missing_suggested: Vec::new(),
            };
        };

        let requirements = TaskRequirements::for_type(task_type);

        let missing_required: Vec<String> = requirements
            .required
            .iter()
            .filter(|field| !task.has_parameter(field))
            .map(|field| describe(field, "Required field"))
            .collect();

        let missing_suggested = requirements
            .suggested
            .iter()
            .filter(|field| !task.has_parameter(field))
            .map(|field| describe(field, "Suggested field"))
            .collect();

        TaskValidation {
            is_valid: missing_required.is_empty(),
            missing_required,
            missing_suggested,
        }
    }

    /// Check every task in order; the report is valid only if every task is.
    #[must_use]
    pub fn validate_tasks(&self, tasks: &[Task]) -> ValidationReport {
        let task_results: Vec<TaskValidationResult> = tasks
            .iter()
            .enumerate()
            .map(|(task_index, task)| {
                // An explicit `"type": null` decodes as absent and lands here too.
                if task.task_type.is_none() {
                    return TaskValidationResult {
                        task_index,
                        is_valid: false,
                        missing_required: vec![TASK_TYPE_REQUIRED.to_string()],
                        missing_suggested: Vec::new(),
                        task: task.clone(),
                    };
                }

                let validation = self.validate_task(task);
                TaskValidationResult {
                    task_index,
                    is_valid: validation.is_valid,
                    missing_required: validation.missing_required,
                    missing_suggested: validation.missing_suggested,
                    task: task.clone(),
                }
            })
            .collect();

        ValidationReport {
            is_valid: task_results.iter().all(|r| r.is_valid),
            task_results,
        }
    }

    /// Render a report as text for the task's author.
    ///
    /// One paragraph per task (1-indexed) with bullet lines for missing
    /// required and suggested fields. Tasks without deficiencies keep their
    /// header and have an empty body.
    #[must_use]
    pub fn generate_feedback_message(&self, report: &ValidationReport) -> String {
        let mut message = String::new();

        for (i, result) in report.task_results.iter().enumerate() {
            let task_type = result
                .task
                .task_type
                .as_deref()
                .unwrap_or("unknown")
                .to_uppercase();
            let _ = writeln!(message, "Task {} ({task_type}):", i + 1);

            if !result.missing_required.is_empty() {
                message.push_str("  Missing required fields:\n");
                for field in &result.missing_required {
                    let _ = writeln!(message, "  - {field}");
                }
            }

            if !result.missing_suggested.is_empty() {
                message.push_str("  Suggested fields (optional but recommended):\n");
                for field in &result.missing_suggested {
                    let _ = writeln!(message, "  - {field}");
                }
            }

            message.push('\n');
        }

        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(value: serde_json::Value) -> Task {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_complete_ci_task_is_valid() {
        let validation = TaskValidator::new().validate_task(&task(json!({
            "type": "ci",
            "parameters": {"repository": "r1", "branch": "main", "build_steps": ["test"]}
        })));
        assert!(validation.is_valid);
        assert!(validation.missing_required.is_empty());
        assert!(validation.missing_suggested.is_empty());
    }

    #[test]
    fn test_missing_suggested_does_not_block() {
        let validation = TaskValidator::new().validate_task(&task(json!({
            "type": "helm",
            "parameters": {"repository": "r1", "app_name": "web"}
        })));
        assert!(validation.is_valid);
        assert_eq!(
            validation.missing_suggested,
            vec![
                "namespace: Kubernetes namespace for deployment".to_string(),
                "values: Custom values for the Helm chart".to_string(),
            ]
        );
    }

    #[test]
    fn test_deploy_without_parameters() {
        let report = TaskValidator::new().validate_tasks(&[task(json!({
            "type": "deploy",
            "parameters": {}
        }))]);

        assert!(!report.is_valid);
        let missing = &report.task_results[0].missing_required;
        assert_eq!(missing.len(), 3);
        assert!(missing.iter().any(|m| m.starts_with("namespace:")));
        assert!(missing.iter().any(|m| m.starts_with("cluster_details:")));
        assert!(missing.iter().any(|m| m.starts_with("repository:")));
    }

    #[test]
    fn test_presence_not_value_is_checked() {
        let validation = TaskValidator::new().validate_task(&task(json!({
            "type": "ci",
            "parameters": {"repository": null}
        })));
        assert!(validation.is_valid);
    }

    #[test]
    fn test_unknown_type() {
        let validator = TaskValidator::new();
        for value in [
            json!({"type": "terraform", "parameters": {"repository": "r"}}),
            json!({"parameters": {"repository": "r"}}),
        ] {
            let validation = validator.validate_task(&task(value));
            assert!(!validation.is_valid);
            assert_eq!(validation.missing_required, vec![UNKNOWN_TASK_TYPE]);
            assert!(validation.missing_suggested.is_empty());
        }
    }

    #[test]
    fn test_missing_type_in_list() {
        let report = TaskValidator::new().validate_tasks(&[
            task(json!({"type": "ci", "parameters": {"repository": "r"}})),
            task(json!({"description": "no type"})),
        ]);

        assert!(!report.is_valid);
        assert!(report.task_results[0].is_valid);
        assert_eq!(report.task_results[1].task_index, 1);
        assert_eq!(
            report.task_results[1].missing_required,
            vec![TASK_TYPE_REQUIRED]
        );
        assert_eq!(report.invalid_tasks().count(), 1);
    }

    #[test]
    fn test_null_and_empty_types_in_list() {
        let report = TaskValidator::new().validate_tasks(&[
            task(json!({"type": null, "parameters": {"repository": "r"}})),
            task(json!({"type": "", "parameters": {"repository": "r"}})),
            task(json!({"type": 7, "parameters": {"repository": "r"}})),
        ]);

        assert!(!report.is_valid);
        assert_eq!(
            report.task_results[0].missing_required,
            vec![TASK_TYPE_REQUIRED]
        );
        assert_eq!(
            report.task_results[1].missing_required,
            vec![UNKNOWN_TASK_TYPE]
        );
        assert_eq!(
            report.task_results[2].missing_required,
            vec![UNKNOWN_TASK_TYPE]
        );
    }

    #[test]
    fn test_empty_list_is_valid() {
        let report = TaskValidator::new().validate_tasks(&[]);
        assert!(report.is_valid);
        assert!(report.task_results.is_empty());
    }

    #[test]
    fn test_feedback_message() {
        let validator = TaskValidator::new();
        let report = validator.validate_tasks(&[
            task(json!({"type": "ci", "parameters": {"repository": "r", "branch": "main", "build_steps": []}})),
            task(json!({"type": "helm", "parameters": {"repository": "r"}})),
            task(json!({"description": "?"})),
        ]);

        let message = validator.generate_feedback_message(&report);

        let expected = "Task 1 (CI):\n\
\n\
Task 2 (HELM):\n\
\x20 Missing required fields:\n\
\x20 - app_name: Name of the application for Helm chart\n\
\x20 Suggested fields (optional but recommended):\n\
\x20 - namespace: Kubernetes namespace for deployment\n\
\x20 - values: Custom values for the Helm chart\n\
\n\
Task 3 (UNKNOWN):\n\
\x20 Missing required fields:\n\
\x20 - Task type is required\n\
\n";
        assert_eq!(message, expected);
    }

    #[test]
    fn test_every_table_field_has_description() {
        for task_type in TaskType::ALL {
            let requirements = TaskRequirements::for_type(task_type);
            for field in requirements.required.iter().chain(requirements.suggested) {
                assert!(parameter_description(field).is_some(), "{field}");
            }
        }
    }
}
