//! Turning free-text issue descriptions into structured tasks.

pub mod openai;

use async_trait::async_trait;
use orchestrator::Task;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub use openai::OpenAiTaskParser;

/// Comment posted when a description cannot be turned into tasks.
pub const PARSE_FAILURE_COMMENT: &str =
    "Unable to parse the task description. Please ensure it follows the required format.";

/// Message shown to the issue author when the analysis service itself failed.
pub const SYSTEM_FAILURE_MESSAGE: &str = "Task analysis failed - see service logs";

/// Parser failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Parser has no credentials
    #[error("description parser is not configured: {0}")]
    NotConfigured(&'static str),

    /// Transport failure talking to the model API
    #[error("request to model API failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Model API answered with an error status
    #[error("model API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API, or the raw body
        message: String,
    },

    /// Model API envelope could not be decoded
    #[error("failed to decode model API response: {0}")]
    Decode(serde_json::Error),

    /// Completion carried no content
    #[error("model returned an empty completion")]
    EmptyCompletion,

    /// Model output is not JSON
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    /// Model output is JSON but not in the expected shape
    #[error("model output is malformed: {0}")]
    Malformed(String),
}

impl ParseError {
    /// The model answered but its output was unusable.
    #[must_use]
    pub const fn is_output_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyCompletion | Self::InvalidJson(_) | Self::Malformed(_)
        )
    }
}

/// Outcome status of a description analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    /// Tasks were extracted
    Success,
    /// Description was rejected or the analysis failed
    Error,
}

/// Structured result of analysing a description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDescription {
    /// Analysis status
    pub status: ParseStatus,
    /// Extracted tasks (empty on error)
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Explanation for the author when `status` is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The failure lies with the service rather than the description
    #[serde(default)]
    pub system_error: bool,
    /// Operator-facing detail for system errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_details: Option<String>,
}

impl ParsedDescription {
    /// Successful analysis.
    #[must_use]
    pub fn success(tasks: Vec<Task>) -> Self {
        Self {
            status: ParseStatus::Success,
            tasks,
            message: None,
            system_error: false,
            log_details: None,
        }
    }

    /// Description rejected with an explanation for its author.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: ParseStatus::Error,
            tasks: Vec::new(),
            message: Some(message.into()),
            system_error: false,
            log_details: None,
        }
    }

    /// Analysis service failure.
    #[must_use]
    pub fn system_failure(error: &ParseError) -> Self {
        Self {
            status: ParseStatus::Error,
            tasks: Vec::new(),
            message: Some(SYSTEM_FAILURE_MESSAGE.to_string()),
            system_error: true,
            log_details: Some(error.to_string()),
        }
    }

    /// Validate and decode the JSON text produced by the model.
    ///
    /// `status` must be `success` or `error`; a `success` result must carry a
    /// `tasks` list.
    pub fn from_model_output(content: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(content).map_err(ParseError::InvalidJson)?;

        let Value::Object(mut fields) = value else {
            return Err(ParseError::Malformed("output is not an object".to_string()));
        };

        let status = match fields.get("status").and_then(Value::as_str) {
            Some("success") => ParseStatus::Success,
            Some("error") => ParseStatus::Error,
            Some(other) => {
                return Err(ParseError::Malformed(format!("unsupported status `{other}`")))
            }
            None => return Err(ParseError::Malformed("missing `status`".to_string())),
        };

        let tasks = match fields.remove("tasks") {
            Some(Value::Array(items)) => items.into_iter().map(decode_task).collect(),
            None | Some(Value::Null) if status == ParseStatus::Error => Vec::new(),
            _ => return Err(ParseError::Malformed("`tasks` is not a list".to_string())),
        };

        let message = fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            status,
            tasks,
            message,
            system_error: false,
            log_details: None,
        })
    }

    /// Tasks were extracted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ParseStatus::Success
    }

    /// Message for the author, with a fallback when the model gave none.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or("The task description could not be analysed")
    }
}

/// Entries that are not objects become untyped tasks, which fail on their own.
fn decode_task(item: Value) -> Task {
    serde_json::from_value(item).unwrap_or_else(|e| {
        warn!(error = %e, "Task entry is not an object");
        Task::default()
    })
}

/// Extracts tasks from a description.
#[async_trait]
pub trait TaskParser: Send + Sync {
    /// Analyse a description.
    async fn parse_description(&self, description: &str) -> Result<ParsedDescription, ParseError>;
}
