//! REST client for Jira.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::models::{CreatedIssue, IssueResponse, NewIssue, Transition, TransitionsResponse};
use super::IssueTracker;
use crate::config::JiraConfig;

/// Jira REST API v2 client using basic auth.
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    api_url: String,
    username: String,
    api_token: String,
}

impl JiraClient {
    /// Create a client for a Jira site.
    ///
    /// # Arguments
    /// * `base_url` - Site URL, e.g. `https://example.atlassian.net`
    /// * `username` - Account email
    /// * `api_token` - API token for the account
    pub fn new(base_url: &str, username: &str, api_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: format!("{}/rest/api/2", base_url.trim_end_matches('/')),
            username: username.to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &JiraConfig) -> Result<Self> {
        if !config.has_credentials() {
            return Err(anyhow!("JIRA_USERNAME and JIRA_API_TOKEN must be set"));
        }
        Self::new(&config.url, &config.username, &config.api_token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .basic_auth(&self.username, Some(&self.api_token))
            .send()
            .await
            .context("Failed to send request to Jira API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Jira API returned error status {status}: {body}"));
        }

        Ok(response)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send(self.client.get(self.url(path)))
            .await?
            .json()
            .await
            .context("Failed to parse Jira API response")
    }

    /// Transitions currently available on an issue.
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    pub async fn transitions(&self, issue_key: &str) -> Result<Vec<Transition>> {
        let response: TransitionsResponse = self
            .get_json(&format!("/issue/{issue_key}/transitions"))
            .await?;
        Ok(response.transitions)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    async fn get_issue_description(&self, issue_key: &str) -> Result<Option<String>> {
        let issue: IssueResponse = self
            .get_json(&format!("/issue/{issue_key}?fields=description"))
            .await?;
        Ok(issue.fields.description)
    }

    #[instrument(skip(self, body), fields(issue_key = %issue_key))]
    async fn add_comment(&self, issue_key: &str, body: &str) -> Result<()> {
        self.send(
            self.client
                .post(self.url(&format!("/issue/{issue_key}/comment")))
                .json(&json!({ "body": body })),
        )
        .await?;
        debug!("Comment added");
        Ok(())
    }

    #[instrument(skip(self), fields(issue_key = %issue_key, status = %status))]
    async fn transition_issue(&self, issue_key: &str, status: &str) -> Result<bool> {
        let transitions = self.transitions(issue_key).await?;

        let Some(transition) = transitions
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(status))
        else {
            warn!(
                available = ?transitions.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "Status transition not found"
            );
            return Ok(false);
        };

        self.send(
            self.client
                .post(self.url(&format!("/issue/{issue_key}/transitions")))
                .json(&json!({ "transition": { "id": transition.id } })),
        )
        .await?;
        debug!(transition_id = %transition.id, "Issue transitioned");
        Ok(true)
    }

    #[instrument(skip(self, issue), fields(project = %issue.project_key, summary = %issue.summary))]
    async fn create_issue(&self, issue: &NewIssue) -> Result<String> {
        let created: CreatedIssue = self
            .send(self.client.post(self.url("/issue")).json(&issue.to_request()))
            .await?
            .json()
            .await
            .context("Failed to parse Jira issue creation response")?;
        debug!(issue_key = %created.key, issue_id = %created.id, "Issue created");
        Ok(created.key)
    }
}
