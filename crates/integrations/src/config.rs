//! Configuration for the gateway service.

use std::env;

/// Read a boolean flag; `true`, `1` and `t` (any case) are true.
fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "t"))
        .unwrap_or(false)
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Skip the parameter pre-flight before dispatch.
    pub disable_task_validation: bool,
    /// Number of system events kept in memory.
    pub event_log_capacity: usize,
    /// Jira settings.
    pub jira: JiraConfig,
    /// Description parser settings.
    pub parser: ParserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("GATEWAY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            disable_task_validation: env_flag("DISABLE_TASK_VALIDATION"),
            event_log_capacity: env::var("EVENT_LOG_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(500),
            jira: JiraConfig::default(),
            parser: ParserConfig::default(),
        }
    }
}

/// Jira integration settings.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Whether webhooks are processed and the issue tracker is called.
    pub enabled: bool,
    /// Jira site URL.
    pub url: String,
    /// Account used for basic auth.
    pub username: String,
    /// API token used for basic auth.
    pub api_token: String,
    /// Project key for issues created from `/task/create`.
    pub project_key: String,
    /// Project name used when a request does not name one.
    pub project_name: String,
    /// Shared secret for webhook signatures.
    pub webhook_secret: Option<String>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("ENABLE_JIRA_INTEGRATION"),
            url: env_or("JIRA_URL", "https://your-domain.atlassian.net"),
            username: env_or("JIRA_USERNAME", ""),
            api_token: env_or("JIRA_API_TOKEN", ""),
            project_key: env_or("JIRA_PROJECT_KEY", "GTMS"),
            project_name: env_or("JIRA_PROJECT_NAME", "Go to Market Sample"),
            webhook_secret: env_non_empty("JIRA_WEBHOOK_SECRET"),
        }
    }
}

impl JiraConfig {
    /// Credentials are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.api_token.is_empty()
    }
}

/// Settings for the LLM-backed description parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// API key; the parser is disabled without one.
    pub api_key: Option<String>,
    /// Chat model.
    pub model: String,
    /// API base URL (`/chat/completions` is appended).
    pub base_url: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            api_key: env_non_empty("OPENAI_API_KEY"),
            model: env_or("OPENAI_MODEL", "gpt-4o"),
            base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            temperature: env::var("OPENAI_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
            max_tokens: env::var("OPENAI_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
        }
    }
}
