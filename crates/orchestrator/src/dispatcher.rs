//! HTTP dispatch of a single task to its agent.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::config::AgentEndpoints;
use crate::models::{AgentResponse, Task, TaskType};
use crate::response::{validate_agent_response, ContractViolation};

/// Why a task could not produce a trusted agent response.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Agent type is not in the routing table (no request was sent)
    #[error("unknown agent type: {0}")]
    UnknownAgent(String),

    /// Agent did not answer within the configured bound
    #[error("{agent} agent timed out after {timeout:?}")]
    Timeout {
        /// Target agent
        agent: TaskType,
        /// Configured bound
        timeout: Duration,
    },

    /// Connection refused, reset, DNS failure, or other transport error
    #[error("failed to reach {agent} agent: {source}")]
    Connection {
        /// Target agent
        agent: TaskType,
        /// Underlying client error
        source: reqwest::Error,
    },

    /// Agent answered with a non-2xx status
    #[error("{agent} agent returned HTTP {status}: {body}")]
    Status {
        /// Target agent
        agent: TaskType,
        /// HTTP status
        status: StatusCode,
        /// Response body, if readable
        body: String,
    },

    /// Agent answered 2xx with a body that is not JSON
    #[error("{agent} agent returned an unparsable body: {source}")]
    InvalidBody {
        /// Target agent
        agent: TaskType,
        /// JSON decoding error
        source: serde_json::Error,
    },

    /// Agent answered 2xx with JSON that breaks the response contract
    #[error("{agent} agent returned an invalid response: {violation}")]
    Contract {
        /// Target agent
        agent: TaskType,
        /// What was wrong with the body
        #[source]
        violation: ContractViolation,
    },
}

impl DispatchError {
    /// Failure happened before or during the HTTP exchange.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connection { .. } | Self::Status { .. }
        )
    }

    /// Agent answered but the body could not be trusted.
    #[must_use]
    pub const fn is_contract(&self) -> bool {
        matches!(self, Self::InvalidBody { .. } | Self::Contract { .. })
    }
}

/// Sends one task to one agent.
///
/// The orchestrator depends on this trait rather than on [`AgentDispatcher`]
/// so that dispatch can be replaced in tests.
#[async_trait]
pub trait AgentDispatch: Send + Sync {
    /// Dispatch `task` to the agent named by `agent_type`.
    async fn route_task(&self, agent_type: &str, task: &Task)
        -> Result<AgentResponse, DispatchError>;
}

/// Dispatches tasks to the agents' `POST {base}/execute` endpoints.
#[derive(Debug, Clone)]
pub struct AgentDispatcher {
    client: reqwest::Client,
    endpoints: AgentEndpoints,
}

impl AgentDispatcher {
    /// Build a dispatcher for the given endpoints.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(endpoints: AgentEndpoints) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(endpoints.timeout)
            .build()?;

        Ok(Self { client, endpoints })
    }

    /// Configured endpoints.
    #[must_use]
    pub const fn endpoints(&self) -> &AgentEndpoints {
        &self.endpoints
    }

    fn transport_error(&self, agent: TaskType, source: reqwest::Error) -> DispatchError {
        if source.is_timeout() {
            DispatchError::Timeout {
                agent,
                timeout: self.endpoints.timeout,
            }
        } else {
            DispatchError::Connection { agent, source }
        }
    }

    async fn execute(&self, agent: TaskType, task: &Task) -> Result<AgentResponse, DispatchError> {
        let url = self.endpoints.execute_url(agent);
        debug!(url = %url, "Sending task to agent");

        let response = self
            .client
            .post(&url)
            .json(task)
            .send()
            .await
            .map_err(|e| self.transport_error(agent, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                agent,
                status,
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(agent, e))?;

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|source| DispatchError::InvalidBody { agent, source })?;

        validate_agent_response(value)
            .map_err(|violation| DispatchError::Contract { agent, violation })
    }
}

#[async_trait]
impl AgentDispatch for AgentDispatcher {
    #[instrument(skip_all, fields(agent_type = %agent_type))]
    async fn route_task(
        &self,
        agent_type: &str,
        task: &Task,
    ) -> Result<AgentResponse, DispatchError> {
        let Ok(agent) = agent_type.parse::<TaskType>() else {
            error!("Unknown agent type: {agent_type}");
            return Err(DispatchError::UnknownAgent(agent_type.to_string()));
        };

        match self.execute(agent, task).await {
            Ok(response) => {
                debug!(status = response.status.as_str(), "Agent responded");
                Ok(response)
            }
            Err(e) => {
                if e.is_contract() {
                    warn!(error = %e, "Rejected agent response");
                } else {
                    error!(error = %e, "Error calling agent");
                }
                Err(e)
            }
        }
    }
}
