//! HTTP server for the DevOps automation gateway.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use orchestrator::{AgentEndpoints, ResultBundle, Task, TaskOrchestrator, TaskType, TaskValidator};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, error, info, warn, Level};

use crate::config::Config;
use crate::events::{EventKind, EventLog};
use crate::jira::{project_key_for, IssueTracker, NewIssue, STATUS_DONE, STATUS_FAILED};
use crate::parser::{ParseError, ParsedDescription, TaskParser, PARSE_FAILURE_COMMENT};
use crate::report::{completion_event_data, completion_summary, format_status_report};
use crate::webhooks::{extract_issue, verify_webhook_signature, SIGNATURE_HEADER};

/// Service name attached to recorded events.
pub const SERVICE: &str = "gateway";

/// Events returned by `GET /task/events`.
pub const TASK_EVENTS_LIMIT: usize = 20;

/// Events returned by `GET /api/dashboard/events`.
pub const DASHBOARD_EVENTS_LIMIT: usize = 50;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const VALIDATION_HEADER: &str = "⚠️ Tasks are missing required details:\n\n";
const VALIDATION_FOOTER: &str =
    "\nPlease update the description with the missing information and try again.";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Agent endpoints, reported by the health check.
    pub agents: AgentEndpoints,
    /// Batch dispatcher.
    pub orchestrator: TaskOrchestrator,
    /// Parameter pre-flight.
    pub validator: TaskValidator,
    /// Description parser, absent when not configured.
    pub parser: Option<Arc<dyn TaskParser>>,
    /// Issue tracker, absent when Jira is not configured.
    pub tracker: Option<Arc<dyn IssueTracker>>,
    /// Recent activity.
    pub events: Arc<EventLog>,
}

impl AppState {
    /// State without parser or tracker.
    #[must_use]
    pub fn new(config: Config, agents: AgentEndpoints, orchestrator: TaskOrchestrator) -> Self {
        let events = Arc::new(EventLog::new(config.event_log_capacity));
        Self {
            config,
            agents,
            orchestrator,
            validator: TaskValidator::new(),
            parser: None,
            tracker: None,
            events,
        }
    }

    /// Attach a description parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn TaskParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Attach an issue tracker.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<dyn IssueTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    async fn record(&self, kind: EventKind, description: impl Into<String>, data: Value) {
        self.events.record(kind, SERVICE, description, data).await;
    }

    async fn analyze(&self, description: &str) -> Result<ParsedDescription, ParseError> {
        match &self.parser {
            Some(parser) => parser.parse_description(description).await,
            None => Err(ParseError::NotConfigured("OPENAI_API_KEY not set")),
        }
    }

    /// Post a comment; failures are logged and otherwise ignored.
    async fn comment(&self, issue_key: &str, body: &str) {
        let Some(tracker) = &self.tracker else {
            debug!(issue_key = %issue_key, "No issue tracker, skipping comment");
            return;
        };
        if let Err(e) = tracker.add_comment(issue_key, body).await {
            error!(issue_key = %issue_key, error = %e, "Failed to add comment");
        }
    }

    /// Transition an issue and record the update.
    async fn transition(&self, issue_key: &str, status: &str) {
        let Some(tracker) = &self.tracker else {
            debug!(issue_key = %issue_key, "No issue tracker, skipping transition");
            return;
        };
        match tracker.transition_issue(issue_key, status).await {
            Ok(true) => {
                self.record(
                    EventKind::JiraUpdate,
                    format!("Updated issue {issue_key} status to {status}"),
                    json!({"issue_key": issue_key, "new_status": status}),
                )
                .await;
            }
            Ok(false) => {
                self.record(
                    EventKind::Warning,
                    format!("Status transition {status} not available for issue {issue_key}"),
                    json!({"issue_key": issue_key, "new_status": status}),
                )
                .await;
            }
            Err(e) => {
                self.record(
                    EventKind::Error,
                    format!("Failed to update issue {issue_key} status to {status}"),
                    json!({"issue_key": issue_key, "new_status": status, "error": e.to_string()}),
                )
                .await;
            }
        }
    }

    /// Dispatch a batch and record the surrounding events.
    async fn run_tasks(&self, tasks: &[Task], issue_key: Option<&str>) -> ResultBundle {
        let task_types: Vec<&str> = tasks.iter().map(Task::type_label).collect();
        self.record(
            EventKind::AgentTriggered,
            format!("Processing {} tasks", tasks.len()),
            json!({"issue_key": issue_key, "task_count": tasks.len(), "task_types": task_types}),
        )
        .await;

        let bundle = self.orchestrator.process_tasks(tasks).await;

        let mut data = completion_event_data(&bundle);
        data["issue_key"] = json!(issue_key);
        self.record(
            EventKind::TaskCompleted,
            completion_summary(&bundle, issue_key),
            data,
        )
        .await;

        bundle
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn parse_body(body: &Bytes) -> Option<Value> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
}

/// Build the HTTP router for the gateway.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Webhook endpoints
        .route("/webhook/jira", post(jira_webhook_handler))
        .route("/webhooks/jira", post(jira_webhook_handler))
        // Direct task endpoints
        .route("/test/analyze", post(analyze_handler))
        .route("/test/ci", post(ci_handler))
        .route("/task/create", post(create_task_handler))
        // Activity
        .route("/task/events", get(task_events))
        .route("/api/dashboard/events", get(dashboard_events))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "services": {
            "gateway": true,
            "jira": state.config.jira.enabled && state.tracker.is_some(),
            "parser": state.parser.is_some(),
            "dispatch_mode": state.orchestrator.mode().as_str(),
            "agents": {
                "ci": state.agents.ci,
                "helm": state.agents.helm,
                "deploy": state.agents.deploy,
            }
        }
    }))
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> Response {
    if state.parser.is_none() {
        return reply(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"status": "not_ready", "reason": "parser_not_configured"}),
        );
    }
    reply(StatusCode::OK, json!({"status": "ready"}))
}

async fn task_events(State(state): State<AppState>) -> Response {
    Json(state.events.recent(TASK_EVENTS_LIMIT).await).into_response()
}

async fn dashboard_events(State(state): State<AppState>) -> Response {
    Json(state.events.recent(DASHBOARD_EVENTS_LIMIT).await).into_response()
}

/// Handle incoming Jira webhooks.
///
/// This handler:
/// 1. Verifies the webhook signature (if a secret is configured)
/// 2. Accepts only DevOps-team issues with a description
/// 3. Extracts tasks from the description and checks their parameters
/// 4. Dispatches the tasks and reports back on the issue
#[allow(clippy::too_many_lines)]
pub async fn jira_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.config.jira.enabled {
        debug!("Jira integration is disabled, ignoring webhook");
        return reply(
            StatusCode::OK,
            json!({"status": "ignored", "reason": "jira_disabled"}),
        );
    }

    info!("Received Jira webhook");
    state
        .record(
            EventKind::WebhookReceived,
            "Jira webhook request received",
            json!({"endpoint": "/webhook/jira", "method": "POST"}),
        )
        .await;

    if let Some(secret) = &state.config.jira.webhook_secret {
        let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
            warn!("Missing X-Hub-Signature header");
            return reply(
                StatusCode::UNAUTHORIZED,
                json!({"error": "Missing webhook signature"}),
            );
        };
        if !verify_webhook_signature(&body, signature, secret) {
            warn!("Invalid webhook signature");
            return reply(
                StatusCode::UNAUTHORIZED,
                json!({"error": "Invalid webhook signature"}),
            );
        }
        debug!("Webhook signature verified");
    }

    let payload = parse_body(&body).unwrap_or(Value::Null);
    let issue = match extract_issue(&payload) {
        Ok(issue) => issue,
        Err(rejection) => {
            warn!(reason = %rejection, "Invalid webhook payload");
            state
                .record(
                    EventKind::Error,
                    "Invalid Jira webhook payload",
                    json!({"endpoint": "/webhook/jira", "reason": rejection.to_string()}),
                )
                .await;
            return reply(
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid webhook payload"}),
            );
        }
    };
    let issue_key = issue.key.as_str();

    info!(issue_key = %issue_key, "Processing Jira issue");
    state
        .record(
            EventKind::TaskReceived,
            format!("Processing Jira issue {issue_key}"),
            json!({"issue_key": issue_key, "description_length": issue.description.len()}),
        )
        .await;
    state
        .record(
            EventKind::AiAnalysis,
            format!("Sending issue {issue_key} description for analysis"),
            json!({"issue_key": issue_key, "description_length": issue.description.len()}),
        )
        .await;

    let parsed = match state.analyze(&issue.description).await {
        Ok(parsed) => parsed,
        Err(e) if e.is_output_error() => {
            state
                .record(
                    EventKind::Error,
                    format!("Failed to parse description for issue {issue_key}"),
                    json!({"issue_key": issue_key, "error": e.to_string()}),
                )
                .await;
            state.comment(issue_key, PARSE_FAILURE_COMMENT).await;
            return reply(
                StatusCode::BAD_REQUEST,
                json!({"status": "error", "message": PARSE_FAILURE_COMMENT}),
            );
        }
        Err(e) => ParsedDescription::system_failure(&e),
    };

    if !parsed.is_success() {
        let message = parsed.error_message();
        state
            .record(
                EventKind::Error,
                format!("Description analysis error for issue {issue_key}: {message}"),
                json!({
                    "issue_key": issue_key,
                    "error_message": message,
                    "is_system_error": parsed.system_error,
                    "log_details": parsed.log_details,
                }),
            )
            .await;
        state.comment(issue_key, message).await;
        if parsed.system_error {
            state.transition(issue_key, STATUS_FAILED).await;
        }
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"status": "error", "message": message}),
        );
    }

    if !state.config.disable_task_validation {
        let report = state.validator.validate_tasks(&parsed.tasks);
        if !report.is_valid {
            warn!(issue_key = %issue_key, "Tasks are missing required details");
            let feedback = format!(
                "{VALIDATION_HEADER}{}{VALIDATION_FOOTER}",
                state.validator.generate_feedback_message(&report)
            );
            state
                .record(
                    EventKind::Warning,
                    format!("Incomplete task details for issue {issue_key}"),
                    json!({"issue_key": issue_key, "validation_result": report}),
                )
                .await;
            state.comment(issue_key, &feedback).await;
            return reply(
                StatusCode::BAD_REQUEST,
                json!({
                    "status": "error",
                    "message": "Tasks are missing required details",
                    "details": report,
                }),
            );
        }
    }

    let bundle = state.run_tasks(&parsed.tasks, Some(issue_key)).await;

    for outcome in &bundle.failed {
        state
            .record(
                EventKind::Error,
                format!(
                    "Task failure in issue {issue_key}: {}",
                    outcome.task.type_label()
                ),
                json!({"issue_key": issue_key, "task": outcome.task, "error": outcome.error}),
            )
            .await;
    }

    state
        .comment(issue_key, &format_status_report(&bundle))
        .await;
    let status = if bundle.all_succeeded() {
        STATUS_DONE
    } else {
        STATUS_FAILED
    };
    state.transition(issue_key, status).await;

    state
        .record(
            EventKind::WebhookCompleted,
            format!("Webhook processing complete for issue {issue_key}"),
            json!({"issue_key": issue_key, "success": bundle.all_succeeded()}),
        )
        .await;

    reply(
        StatusCode::OK,
        json!({"status": "success", "message": "Tasks processed", "results": bundle}),
    )
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    description: Option<String>,
}

/// Analyse a description and dispatch its tasks without Jira.
async fn analyze_handler(State(state): State<AppState>, body: Bytes) -> Response {
    state
        .record(
            EventKind::TaskReceived,
            "Test analysis request received",
            json!({"endpoint": "/test/analyze", "method": "POST"}),
        )
        .await;

    let Some(payload) = parse_body(&body) else {
        state
            .record(
                EventKind::Error,
                "Invalid request format - not JSON",
                json!({"endpoint": "/test/analyze"}),
            )
            .await;
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": "Request must be JSON"}),
        );
    };

    let request: AnalyzeRequest = serde_json::from_value(payload).unwrap_or_default();
    let Some(description) = request.description.filter(|d| !d.is_empty()) else {
        state
            .record(
                EventKind::Error,
                "Missing required field 'description'",
                json!({"endpoint": "/test/analyze"}),
            )
            .await;
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": "Description is required"}),
        );
    };

    state
        .record(
            EventKind::AiAnalysis,
            "Sending task description for analysis",
            json!({"description_length": description.len()}),
        )
        .await;

    let parsed = match state.analyze(&description).await {
        Ok(parsed) if parsed.is_success() => parsed,
        Ok(parsed) => {
            let message = parsed.error_message().to_string();
            state
                .record(
                    EventKind::Error,
                    format!("Description analysis error: {message}"),
                    json!({"is_system_error": parsed.system_error}),
                )
                .await;
            return reply(
                StatusCode::BAD_REQUEST,
                json!({"status": "error", "message": message}),
            );
        }
        Err(e) => {
            state
                .record(
                    EventKind::Error,
                    "Description analysis failed",
                    json!({"error": e.to_string()}),
                )
                .await;
            return reply(
                StatusCode::BAD_REQUEST,
                json!({"status": "error", "message": "Unable to parse the task description"}),
            );
        }
    };

    let bundle = state.run_tasks(&parsed.tasks, None).await;

    reply(
        StatusCode::OK,
        json!({"status": "success", "message": "Tasks processed", "results": bundle}),
    )
}

#[derive(Debug, Default, Deserialize)]
struct CiRequest {
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    build_steps: Option<Value>,
}

/// Send a single CI task straight to the CI agent.
async fn ci_handler(State(state): State<AppState>, body: Bytes) -> Response {
    state
        .record(
            EventKind::TaskReceived,
            "CI pipeline creation test request received",
            json!({"endpoint": "/test/ci", "method": "POST"}),
        )
        .await;

    let Some(payload) = parse_body(&body) else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": "Request must be JSON"}),
        );
    };

    let request: CiRequest = serde_json::from_value(payload).unwrap_or_default();
    let Some(repository) = request.repository.filter(|r| !r.is_empty()) else {
        state
            .record(
                EventKind::Error,
                "Missing required field 'repository'",
                json!({"endpoint": "/test/ci"}),
            )
            .await;
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": "Repository URL is required"}),
        );
    };

    let branch = request.branch.unwrap_or_else(|| "main".to_string());
    let build_steps = request
        .build_steps
        .unwrap_or_else(|| json!(["test", "lint", "build"]));

    let task = Task::new(TaskType::Ci, "Set up CI pipeline")
        .with_parameter("repository", repository.clone())
        .with_parameter("branch", branch.clone())
        .with_parameter("build_steps", build_steps.clone());

    state
        .record(
            EventKind::AgentTriggered,
            format!("Directly triggering CI agent for repository: {repository}"),
            json!({"repository": repository, "branch": branch, "build_steps": build_steps}),
        )
        .await;

    let outcome = state.orchestrator.dispatch_one(&task).await;

    let Some(result) = outcome.result else {
        state
            .record(
                EventKind::Error,
                format!("CI agent failed to process task for repository: {repository}"),
                json!({"repository": repository, "error": outcome.error}),
            )
            .await;
        return reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"status": "error", "message": "Failed to process CI task"}),
        );
    };

    state
        .record(
            EventKind::TaskCompleted,
            format!("CI pipeline request completed for repository: {repository}"),
            json!({
                "repository": repository,
                "ci_status": result.status.as_str(),
                "classification": outcome.classification,
            }),
        )
        .await;

    reply(
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "CI pipeline created",
            "classification": outcome.classification,
            "error": outcome.error,
            "result": result,
        }),
    )
}

#[derive(Debug, Default, Deserialize)]
struct CreateTaskRequest {
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

/// Create a task from a prompt, optionally tracking it as a Jira issue.
async fn create_task_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(payload) = parse_body(&body) else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"status": "error", "message": "No data provided"}),
        );
    };

    let request: CreateTaskRequest = serde_json::from_value(payload).unwrap_or_default();
    let Some(prompt) = request.prompt.filter(|p| !p.is_empty()) else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"status": "error", "message": "No task description provided"}),
        );
    };
    let project_key = request
        .project
        .as_deref()
        .filter(|p| !p.is_empty())
        .map_or_else(|| state.config.jira.project_key.clone(), project_key_for);
    let project = request
        .project
        .unwrap_or_else(|| state.config.jira.project_name.clone());

    state
        .record(
            EventKind::TaskReceived,
            format!("Received direct task request for project: {project}"),
            json!({"project": project, "prompt_length": prompt.len(), "source": "task_page"}),
        )
        .await;
    state
        .record(
            EventKind::AiAnalysis,
            "Analyzing task description",
            json!({"prompt_length": prompt.len()}),
        )
        .await;

    let parsed = match state.analyze(&prompt).await {
        Ok(parsed) if parsed.is_success() => parsed,
        other => {
            let error = match other {
                Ok(parsed) => parsed.error_message().to_string(),
                Err(e) => e.to_string(),
            };
            let preview: String = prompt.chars().take(100).collect();
            state
                .record(
                    EventKind::Error,
                    "Failed to parse task description",
                    json!({"prompt": preview, "error": error}),
                )
                .await;
            return reply(
                StatusCode::BAD_REQUEST,
                json!({
                    "status": "error",
                    "message": "Failed to parse task description. Please try again with more details."
                }),
            );
        }
    };

    let mut jira_key = None;
    let tracker = state.tracker.as_ref().filter(|_| state.config.jira.enabled);
    if let Some(tracker) = tracker {
        state
            .record(
                EventKind::JiraCreate,
                format!("Creating Jira ticket for project: {project}"),
                json!({"project": project, "project_key": project_key}),
            )
            .await;

        match tracker
            .create_issue(&NewIssue::devops_task(&project_key, &prompt))
            .await
        {
            Ok(key) => {
                state
                    .record(
                        EventKind::JiraCreated,
                        format!("Jira ticket created: {key}"),
                        json!({"jira_key": key, "project": project}),
                    )
                    .await;
                jira_key = Some(key);
            }
            Err(e) => {
                state
                    .record(
                        EventKind::Warning,
                        format!("Failed to create Jira ticket: {e}"),
                        json!({"project": project, "error": e.to_string()}),
                    )
                    .await;
            }
        }
    }

    let bundle = state.run_tasks(&parsed.tasks, jira_key.as_deref()).await;

    reply(
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "Task processed successfully",
            "jira_key": jira_key,
            "parsed_data": parsed,
            "results": bundle,
        }),
    )
}
