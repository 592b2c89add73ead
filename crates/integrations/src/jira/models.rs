//! Jira REST v2 request and response shapes.

use serde::{Deserialize, Serialize};

/// Longest summary taken from a prompt's first line.
pub const SUMMARY_MAX_CHARS: usize = 50;

/// Label applied to issues created by the gateway.
pub const DEVOPS_LABEL: &str = "devops";

/// Issue to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    /// Project key
    pub project_key: String,
    /// One-line summary
    pub summary: String,
    /// Full description
    pub description: String,
    /// Issue type name
    pub issue_type: String,
    /// Labels
    pub labels: Vec<String>,
}

impl NewIssue {
    /// DevOps task issue for a free-text prompt.
    pub fn devops_task(project_key: impl Into<String>, prompt: &str) -> Self {
        Self {
            project_key: project_key.into(),
            summary: summarize(prompt),
            description: prompt.to_string(),
            issue_type: "Task".to_string(),
            labels: vec![DEVOPS_LABEL.to_string()],
        }
    }

    pub(crate) fn to_request(&self) -> CreateIssueRequest<'_> {
        CreateIssueRequest {
            fields: CreateIssueFields {
                project: KeyRef {
                    key: &self.project_key,
                },
                summary: &self.summary,
                description: &self.description,
                issuetype: NameRef {
                    name: &self.issue_type,
                },
                labels: &self.labels,
            },
        }
    }
}

/// First line of `prompt`, cut to [`SUMMARY_MAX_CHARS`] with `...` when cut.
#[must_use]
pub fn summarize(prompt: &str) -> String {
    let first_line = prompt.split('\n').next().unwrap_or_default();
    if first_line.chars().count() <= SUMMARY_MAX_CHARS {
        return first_line.to_string();
    }
    let mut summary: String = first_line.chars().take(SUMMARY_MAX_CHARS).collect();
    summary.push_str("...");
    summary
}

/// Project key derived from a display name: `Customer Portal` -> `CUSTOMER_PORTAL`.
#[must_use]
pub fn project_key_for(name: &str) -> String {
    name.replace(' ', "_").to_uppercase()
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIssueRequest<'a> {
    pub fields: CreateIssueFields<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIssueFields<'a> {
    pub project: KeyRef<'a>,
    pub summary: &'a str,
    pub description: &'a str,
    pub issuetype: NameRef<'a>,
    pub labels: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct KeyRef<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NameRef<'a> {
    pub name: &'a str,
}

/// Response to issue creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    /// Numeric id
    pub id: String,
    /// Issue key
    pub key: String,
}

/// Subset of an issue returned by `GET /issue/{key}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IssueResponse {
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct IssueFields {
    #[serde(default)]
    pub description: Option<String>,
}

/// Workflow transition available on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transition {
    /// Transition id
    pub id: String,
    /// Display name, e.g. `Done`
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}
