//! Jira issue tracking.
//!
//! The gateway reports back to the issue a webhook came from: comments with
//! feedback or results, and a workflow transition once processing is done.

pub mod client;
pub mod models;

use anyhow::Result;
use async_trait::async_trait;

pub use client::JiraClient;
pub use models::{project_key_for, summarize, NewIssue, Transition};

/// Transition applied when every task succeeded.
pub const STATUS_DONE: &str = "Done";

/// Transition applied when any task failed or the analysis broke.
pub const STATUS_FAILED: &str = "Failed";

/// Operations the gateway needs from an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Description of an issue, `None` when it has none.
    async fn get_issue_description(&self, issue_key: &str) -> Result<Option<String>>;

    /// Post a comment.
    async fn add_comment(&self, issue_key: &str, body: &str) -> Result<()>;

    /// Apply the transition whose name matches `status` case-insensitively.
    ///
    /// Returns `Ok(false)` when the issue has no such transition.
    async fn transition_issue(&self, issue_key: &str, status: &str) -> Result<bool>;

    /// Create an issue and return its key.
    async fn create_issue(&self, issue: &NewIssue) -> Result<String>;
}
