//! Description parser backed by the OpenAI chat completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{ParseError, ParsedDescription, TaskParser};
use crate::config::ParserConfig;

const SYSTEM_PROMPT: &str = r#"You analyse Jira issue descriptions written for a DevOps team and extract the automation tasks they ask for.

Respond with a single JSON object.

When the description asks for CI, Helm or deployment work, respond with:
{"status": "success", "tasks": [{"type": "...", "description": "...", "parameters": {...}}]}

Each task has:
- type: "ci", "helm" or "deploy"
- description: what the task must achieve
- parameters: the settings the description provides
  - ci: repository, branch, build_steps
  - helm: repository, app_name, namespace, values
  - deploy: repository, namespace, cluster_details, helm_values, release_name

Only include parameters the description actually states.

When the description is not about DevOps automation or is too vague to act on, respond with:
{"status": "error", "message": "<what is missing or unclear>"}"#;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// Parses descriptions with an OpenAI chat model in JSON mode.
#[derive(Debug, Clone)]
pub struct OpenAiTaskParser {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiTaskParser {
    /// Create a parser from configuration.
    pub fn from_config(config: &ParserConfig) -> Result<Self, ParseError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ParseError::NotConfigured("OPENAI_API_KEY not set"))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Model in use.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, description: &str) -> Result<String, ParseError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: description,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            return Err(ParseError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatResponse = serde_json::from_str(&body).map_err(ParseError::Decode)?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ParseError::EmptyCompletion)
    }
}

#[async_trait]
impl TaskParser for OpenAiTaskParser {
    #[instrument(skip(self, description), fields(model = %self.model, description_len = description.len()))]
    async fn parse_description(&self, description: &str) -> Result<ParsedDescription, ParseError> {
        let content = self.complete(description).await.inspect_err(|e| {
            error!(error = %e, "Description analysis request failed");
        })?;
        debug!(content = %content, "Received model output");

        ParsedDescription::from_model_output(&content).inspect_err(|e| {
            error!(error = %e, "Model output rejected");
        })
    }
}
