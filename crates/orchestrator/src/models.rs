//! Task, agent response and outcome types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Error recorded for a task submitted without a declared type.
pub const MISSING_AGENT_TYPE: &str = "Missing agent type";

/// Error recorded when an agent could not be reached or replied with a malformed body.
pub const AGENT_UNAVAILABLE: &str = "Agent unavailable";

/// Downstream agent kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// CI pipeline generation (Jenkinsfile)
    Ci,
    /// Helm chart generation
    Helm,
    /// Kubernetes deployment
    Deploy,
}

impl TaskType {
    /// All agent kinds, in routing-table order.
    pub const ALL: [Self; 3] = [Self::Ci, Self::Helm, Self::Deploy];

    /// Wire name of the task type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ci => "ci",
            Self::Helm => "helm",
            Self::Deploy => "deploy",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known agent kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTaskType(pub String);

impl fmt::Display for UnknownTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown task type: {}", self.0)
    }
}

impl std::error::Error for UnknownTaskType {}

impl FromStr for TaskType {
    type Err = UnknownTaskType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ci" => Ok(Self::Ci),
            "helm" => Ok(Self::Helm),
            "deploy" => Ok(Self::Deploy),
            other => Err(UnknownTaskType(other.to_string())),
        }
    }
}

/// A single unit of work destined for one agent.
///
/// The declared type is kept as raw text so that tasks with a missing or
/// unrecognised type still deserialize and can be classified instead of
/// failing the whole batch.
///
/// Decoding never rejects a field's shape. A non-string type or description
/// is kept as its JSON text, so such a type later fails as an unknown agent.
/// `null` fields and non-object parameters decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Declared agent type (`ci`, `helm`, `deploy`)
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_type: Option<String>,
    /// Free-text description
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    /// Structured parameters for the agent
    #[serde(default, deserialize_with = "lenient_map")]
    pub parameters: Map<String, Value>,
}

// `null` is treated the same as an absent type.
fn lenient_type<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

impl Task {
    /// Create a task of a known type.
    pub fn new(task_type: TaskType, description: impl Into<String>) -> Self {
        Self {
            task_type: Some(task_type.as_str().to_string()),
            description: description.into(),
            parameters: Map::new(),
        }
    }

    /// Add a parameter (builder style).
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Declared type, treating an empty string the same as an absent one.
    #[must_use]
    pub fn declared_type(&self) -> Option<&str> {
        self.task_type.as_deref().filter(|t| !t.is_empty())
    }

    /// Declared type parsed into a known agent kind.
    #[must_use]
    pub fn kind(&self) -> Option<TaskType> {
        self.declared_type().and_then(|t| t.parse().ok())
    }

    /// Declared type for display, `unknown` when absent.
    #[must_use]
    pub fn type_label(&self) -> &str {
        self.declared_type().unwrap_or("unknown")
    }

    /// Whether a parameter key is present (its value is not inspected).
    #[must_use]
    pub fn has_parameter(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    /// Look up a parameter value.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

/// Status reported by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Work completed
    Success,
    /// Work completed with caveats
    Warning,
    /// Work failed
    Error,
}

impl AgentStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(other.to_string()),
        }
    }
}

/// A validated agent reply.
///
/// Only constructed through [`crate::response::validate_agent_response`], so
/// the classification logic never sees an untyped map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Reported status
    pub status: AgentStatus,
    /// Human-readable message
    pub message: String,
    /// Optional structured details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    /// Additional top-level fields some agents return instead of `details`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentResponse {
    /// Build a response without details.
    pub fn new(status: AgentStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            extra: Map::new(),
        }
    }

    /// Attach a details mapping.
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Final classification of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Agent reported success
    Success,
    /// Agent reported success with a warning
    Warning,
    /// Rejected, unreachable, malformed, or agent-reported failure
    Failed,
}

/// Outcome of one task in one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Submission position of the task
    pub index: usize,
    /// The submitted task
    pub task: Task,
    /// Validated agent reply, if one was received
    pub result: Option<AgentResponse>,
    /// Classification of the outcome
    pub classification: Classification,
    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Agent message for success-with-warning outcomes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl TaskOutcome {
    /// Agent reported success.
    #[must_use]
    pub fn success(index: usize, task: Task, response: AgentResponse) -> Self {
        Self {
            index,
            task,
            result: Some(response),
            classification: Classification::Success,
            error: None,
            warning: None,
        }
    }

    /// Agent reported success with a warning; the message is kept verbatim.
    #[must_use]
    pub fn warning(index: usize, task: Task, response: AgentResponse) -> Self {
        let warning = response.message.clone();
        Self {
            index,
            task,
            result: Some(response),
            classification: Classification::Warning,
            error: None,
            warning: Some(warning),
        }
    }

    /// Task failed.
    #[must_use]
    pub fn failed(
        index: usize,
        task: Task,
        result: Option<AgentResponse>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            index,
            task,
            result,
            classification: Classification::Failed,
            error: Some(error.into()),
            warning: None,
        }
    }

    /// Whether this outcome belongs in the success sequence.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self.classification, Classification::Failed)
    }

    /// Whether this outcome carries a warning.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self.classification, Classification::Warning)
    }
}

/// Aggregated outcomes of one orchestration run.
///
/// Every submitted task appears in exactly one sequence, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    /// Successful outcomes, including warnings
    pub success: Vec<TaskOutcome>,
    /// Failed outcomes
    pub failed: Vec<TaskOutcome>,
}

impl ResultBundle {
    /// Partition outcomes, already in submission order, into the two sequences.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = TaskOutcome>) -> Self {
        let (success, failed) = outcomes.into_iter().partition(TaskOutcome::is_success);
        Self { success, failed }
    }

    /// Number of successful outcomes (warnings included).
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.success.len()
    }

    /// Number of failed outcomes.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Number of successful outcomes that carry a warning.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.success.iter().filter(|o| o.is_warning()).count()
    }

    /// Total number of tasks.
    #[must_use]
    pub fn total(&self) -> usize {
        self.success.len() + self.failed.len()
    }

    /// True when no task failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// `(task type, error)` for every failed outcome.
    #[must_use]
    pub fn failure_summary(&self) -> Vec<(String, String)> {
        self.failed
            .iter()
            .map(|o| {
                (
                    o.task.type_label().to_string(),
                    o.error.clone().unwrap_or_else(|| "Unknown error".to_string()),
                )
            })
            .collect()
    }
}
