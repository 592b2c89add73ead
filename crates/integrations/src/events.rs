//! In-memory log of gateway activity.
//!
//! Keeps the most recent events for the dashboard endpoints and mirrors every
//! event to `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Kind of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Jira webhook arrived
    WebhookReceived,
    /// Webhook fully handled
    WebhookCompleted,
    /// Task request accepted for processing
    TaskReceived,
    /// Description sent for analysis
    AiAnalysis,
    /// Tasks handed to agents
    AgentTriggered,
    /// Task processing finished
    TaskCompleted,
    /// Jira issue updated
    JiraUpdate,
    /// Jira issue creation requested
    JiraCreate,
    /// Jira issue created
    JiraCreated,
    /// Recoverable problem
    Warning,
    /// Failure
    Error,
}

impl EventKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WebhookReceived => "webhook_received",
            Self::WebhookCompleted => "webhook_completed",
            Self::TaskReceived => "task_received",
            Self::AiAnalysis => "ai_analysis",
            Self::AgentTriggered => "agent_triggered",
            Self::TaskCompleted => "task_completed",
            Self::JiraUpdate => "jira_update",
            Self::JiraCreate => "jira_create",
            Self::JiraCreated => "jira_created",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    /// Unique id
    pub id: Uuid,
    /// Kind
    pub event_type: EventKind,
    /// Component that produced the event
    pub service: String,
    /// Human-readable summary
    pub description: String,
    /// Structured payload
    pub event_data: Value,
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
}

/// Bounded event store, newest first.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    events: RwLock<VecDeque<SystemEvent>>,
}

impl EventLog {
    /// Create a log keeping at most `capacity` events (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of events kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record an event, evicting the oldest when full.
    pub async fn record(
        &self,
        kind: EventKind,
        service: &str,
        description: impl Into<String>,
        event_data: Value,
    ) -> SystemEvent {
        let event = SystemEvent {
            id: Uuid::new_v4(),
            event_type: kind,
            service: service.to_string(),
            description: description.into(),
            event_data: if event_data.is_null() {
                Value::Object(Map::new())
            } else {
                event_data
            },
            timestamp: Utc::now(),
        };

        match kind {
            EventKind::Warning | EventKind::Error => warn!(
                event_type = %kind,
                service = %event.service,
                "SYSTEM EVENT: {}",
                event.description
            ),
            _ => info!(
                event_type = %kind,
                service = %event.service,
                "SYSTEM EVENT: {}",
                event.description
            ),
        }

        let mut events = self.events.write().await;
        if events.len() == self.capacity {
            events.pop_back();
        }
        events.push_front(event.clone());

        event
    }

    /// Up to `limit` most recent events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<SystemEvent> {
        self.events.read().await.iter().take(limit).cloned().collect()
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether no event is stored.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(500)
    }
}
