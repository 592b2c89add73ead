//! Agent endpoint configuration.

use std::env;
use std::time::Duration;

use crate::models::TaskType;

/// Default bound on a single agent call.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URLs of the three agents and the per-call timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEndpoints {
    /// CI pipeline agent.
    pub ci: String,
    /// Helm chart agent.
    pub helm: String,
    /// Deployment agent.
    pub deploy: String,
    /// Upper bound on one agent call.
    pub timeout: Duration,
}

impl Default for AgentEndpoints {
    fn default() -> Self {
        Self {
            ci: env::var("CI_AGENT_URL").unwrap_or_else(|_| "http://localhost:9001".to_string()),
            helm: env::var("HELM_AGENT_URL")
                .unwrap_or_else(|_| "http://localhost:9002".to_string()),
            deploy: env::var("DEPLOY_AGENT_URL")
                .unwrap_or_else(|_| "http://localhost:9003".to_string()),
            timeout: env::var("AGENT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(DEFAULT_AGENT_TIMEOUT, Duration::from_secs),
        }
    }
}

impl AgentEndpoints {
    /// Endpoints with explicit URLs and the default timeout.
    pub fn new(
        ci: impl Into<String>,
        helm: impl Into<String>,
        deploy: impl Into<String>,
    ) -> Self {
        Self {
            ci: ci.into(),
            helm: helm.into(),
            deploy: deploy.into(),
            timeout: DEFAULT_AGENT_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL for an agent.
    #[must_use]
    pub fn base_url(&self, task_type: TaskType) -> &str {
        match task_type {
            TaskType::Ci => &self.ci,
            TaskType::Helm => &self.helm,
            TaskType::Deploy => &self.deploy,
        }
    }

    /// `{base}/execute` for an agent, ignoring trailing slashes on the base.
    #[must_use]
    pub fn execute_url(&self, task_type: TaskType) -> String {
        format!("{}/execute", self.base_url(task_type).trim_end_matches('/'))
    }
}

/// How a batch of tasks is dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One task after another, in submission order.
    Sequential,
    /// Every task in its own unit of work, joined before aggregation.
    #[default]
    Concurrent,
}

impl ExecutionMode {
    /// Setting name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }

    /// Read `DISPATCH_MODE` (`sequential` | `concurrent`).
    #[must_use]
    pub fn from_env() -> Self {
        match env::var("DISPATCH_MODE") {
            Ok(mode) if mode.eq_ignore_ascii_case("sequential") => Self::Sequential,
            _ => Self::Concurrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_endpoints() {
        env::remove_var("CI_AGENT_URL");
        env::remove_var("HELM_AGENT_URL");
        env::remove_var("DEPLOY_AGENT_URL");
        env::remove_var("AGENT_TIMEOUT_SECS");

        let endpoints = AgentEndpoints::default();
        assert_eq!(endpoints.ci, "http://localhost:9001");
        assert_eq!(endpoints.helm, "http://localhost:9002");
        assert_eq!(endpoints.deploy, "http://localhost:9003");
        assert_eq!(endpoints.timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_endpoints_from_env() {
        env::set_var("HELM_AGENT_URL", "http://helm-agent:8080");
        env::set_var("AGENT_TIMEOUT_SECS", "5");

        let endpoints = AgentEndpoints::default();
        assert_eq!(endpoints.helm, "http://helm-agent:8080");
        assert_eq!(endpoints.timeout, Duration::from_secs(5));

        env::set_var("AGENT_TIMEOUT_SECS", "soon");
        assert_eq!(AgentEndpoints::default().timeout, DEFAULT_AGENT_TIMEOUT);

        env::remove_var("HELM_AGENT_URL");
        env::remove_var("AGENT_TIMEOUT_SECS");
    }

    #[test]
    fn test_execute_url_trims_trailing_slash() {
        let endpoints = AgentEndpoints::new("http://ci/", "http://helm", "http://deploy//");
        assert_eq!(endpoints.execute_url(TaskType::Ci), "http://ci/execute");
        assert_eq!(endpoints.execute_url(TaskType::Helm), "http://helm/execute");
        assert_eq!(endpoints.execute_url(TaskType::Deploy), "http://deploy/execute");
    }

    #[test]
    #[serial]
    fn test_execution_mode_from_env() {
        env::set_var("DISPATCH_MODE", "Sequential");
        assert_eq!(ExecutionMode::from_env(), ExecutionMode::Sequential);
        env::set_var("DISPATCH_MODE", "parallel");
        assert_eq!(ExecutionMode::from_env(), ExecutionMode::Concurrent);
        env::remove_var("DISPATCH_MODE");
        assert_eq!(ExecutionMode::from_env(), ExecutionMode::Concurrent);
    }
}
