//! End-to-end dispatch against mock agents served over loopback HTTP.

use axum::{http::StatusCode, routing::post, Json, Router};
use orchestrator::{
    AgentDispatcher, AgentEndpoints, Classification, ExecutionMode, Task, TaskOrchestrator,
    TaskType, TaskValidator, AGENT_UNAVAILABLE, MISSING_AGENT_TYPE,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

struct MockAgent {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl MockAgent {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `POST /execute` answering every request with `status` and `body` after `delay`.
async fn spawn_agent(status: StatusCode, body: String, delay: Duration) -> MockAgent {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/execute",
        post(move |Json(_task): Json<Value>| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            (status, body)
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockAgent {
        base_url: format!("http://{addr}"),
        hits,
    }
}

async fn json_agent(body: Value) -> MockAgent {
    spawn_agent(StatusCode::OK, body.to_string(), Duration::ZERO).await
}

fn orchestrator_for(
    ci: &MockAgent,
    helm: &MockAgent,
    deploy: &MockAgent,
    timeout: Duration,
    mode: ExecutionMode,
) -> TaskOrchestrator {
    let endpoints = AgentEndpoints::new(&ci.base_url, &helm.base_url, &deploy.base_url)
        .with_timeout(timeout);
    let dispatcher = AgentDispatcher::new(endpoints).unwrap();
    TaskOrchestrator::new(Arc::new(dispatcher)).with_mode(mode)
}

fn ok_body() -> Value {
    json!({"status": "success", "message": "ok", "details": {}})
}

fn task(value: Value) -> Task {
    serde_json::from_value(value).unwrap()
}

const MODES: [ExecutionMode; 2] = [ExecutionMode::Sequential, ExecutionMode::Concurrent];

#[tokio::test]
async fn test_single_ci_task_succeeds() {
    let ci = json_agent(ok_body()).await;
    let helm = json_agent(ok_body()).await;
    let deploy = json_agent(ok_body()).await;

    let tasks = vec![task(json!({
        "type": "ci",
        "description": "Create a Jenkins pipeline",
        "parameters": {"repository": "r1", "branch": "main", "build_steps": ["test"]}
    }))];

    for mode in MODES {
        let orchestrator = orchestrator_for(&ci, &helm, &deploy, Duration::from_secs(5), mode);
        let bundle = orchestrator.process_tasks(&tasks).await;

        assert_eq!(bundle.success.len(), 1);
        assert!(bundle.failed.is_empty());
        assert_eq!(bundle.success[0].result.as_ref().unwrap().message, "ok");
    }

    assert_eq!(ci.hits(), 2);
    assert_eq!(helm.hits(), 0);
    assert_eq!(deploy.hits(), 0);
}

#[tokio::test]
async fn test_incomplete_deploy_task_is_flagged_and_rejection_is_contained() {
    let ci = json_agent(ok_body()).await;
    let helm = json_agent(ok_body()).await;
    let deploy = spawn_agent(
        StatusCode::BAD_REQUEST,
        json!({"error": "namespace is required"}).to_string(),
        Duration::ZERO,
    )
    .await;

    let tasks = vec![task(json!({"type": "deploy", "parameters": {}}))];

    let report = TaskValidator::new().validate_tasks(&tasks);
    assert!(!report.is_valid);
    let missing = &report.task_results[0].missing_required;
    assert!(missing.iter().any(|m| m.starts_with("namespace:")));
    assert!(missing.iter().any(|m| m.starts_with("cluster_details:")));

    let orchestrator = orchestrator_for(
        &ci,
        &helm,
        &deploy,
        Duration::from_secs(5),
        ExecutionMode::Concurrent,
    );
    let bundle = orchestrator.process_tasks(&tasks).await;

    assert!(bundle.success.is_empty());
    assert_eq!(bundle.failed[0].error.as_deref(), Some(AGENT_UNAVAILABLE));
    assert_eq!(deploy.hits(), 1);
}

#[tokio::test]
async fn test_timed_out_agent_fails_only_its_task() {
    let ci = json_agent(ok_body()).await;
    let helm = spawn_agent(StatusCode::OK, ok_body().to_string(), Duration::from_secs(3)).await;
    let deploy = json_agent(ok_body()).await;

    let tasks = vec![
        Task::new(TaskType::Ci, "pipeline").with_parameter("repository", "r1"),
        Task::new(TaskType::Helm, "chart")
            .with_parameter("repository", "r1")
            .with_parameter("app_name", "web"),
    ];

    for mode in MODES {
        let orchestrator =
            orchestrator_for(&ci, &helm, &deploy, Duration::from_millis(300), mode);
        let bundle = orchestrator.process_tasks(&tasks).await;

        assert_eq!(bundle.success.len(), 1);
        assert_eq!(bundle.success[0].index, 0);
        assert_eq!(bundle.success[0].task, tasks[0]);

        assert_eq!(bundle.failed.len(), 1);
        assert_eq!(bundle.failed[0].index, 1);
        assert_eq!(bundle.failed[0].task, tasks[1]);
        assert_eq!(bundle.failed[0].error.as_deref(), Some(AGENT_UNAVAILABLE));
    }
}

#[tokio::test]
async fn test_response_missing_message_is_not_success() {
    let ci = json_agent(json!({"status": "success"})).await;
    let helm = json_agent(ok_body()).await;
    let deploy = json_agent(ok_body()).await;

    let orchestrator = orchestrator_for(
        &ci,
        &helm,
        &deploy,
        Duration::from_secs(5),
        ExecutionMode::Sequential,
    );
    let bundle = orchestrator
        .process_tasks(&[Task::new(TaskType::Ci, "pipeline").with_parameter("repository", "r")])
        .await;

    assert!(bundle.success.is_empty());
    assert_eq!(bundle.failed[0].error.as_deref(), Some(AGENT_UNAVAILABLE));
    assert!(bundle.failed[0].result.is_none());
}

#[tokio::test]
async fn test_non_json_body_is_unavailable() {
    let ci = spawn_agent(StatusCode::OK, "<html>ok</html>".to_string(), Duration::ZERO).await;
    let helm = json_agent(ok_body()).await;
    let deploy = json_agent(ok_body()).await;

    let orchestrator = orchestrator_for(
        &ci,
        &helm,
        &deploy,
        Duration::from_secs(5),
        ExecutionMode::Concurrent,
    );
    let outcome = orchestrator
        .dispatch_one(&Task::new(TaskType::Ci, "pipeline"))
        .await;

    assert_eq!(outcome.classification, Classification::Failed);
    assert_eq!(outcome.error.as_deref(), Some(AGENT_UNAVAILABLE));
}

#[tokio::test]
async fn test_agent_warning_and_error_statuses() {
    let ci = json_agent(json!({"status": "warning", "message": "no tests found"})).await;
    let helm = json_agent(json!({
        "status": "error",
        "message": "chart template invalid",
        "details": {"line": 12}
    }))
    .await;
    let deploy = json_agent(ok_body()).await;

    let orchestrator = orchestrator_for(
        &ci,
        &helm,
        &deploy,
        Duration::from_secs(5),
        ExecutionMode::Concurrent,
    );
    let bundle = orchestrator
        .process_tasks(&[
            Task::new(TaskType::Ci, "pipeline"),
            Task::new(TaskType::Helm, "chart"),
        ])
        .await;

    assert_eq!(bundle.success[0].warning.as_deref(), Some("no tests found"));
    assert_eq!(bundle.warning_count(), 1);
    assert_eq!(
        bundle.failed[0].error.as_deref(),
        Some("Agent execution failed: chart template invalid")
    );
    let details = bundle.failed[0].result.as_ref().unwrap().details.as_ref().unwrap();
    assert_eq!(details["line"], json!(12));
}

#[tokio::test]
async fn test_untyped_and_unknown_tasks_never_reach_agents() {
    let ci = json_agent(ok_body()).await;
    let helm = json_agent(ok_body()).await;
    let deploy = json_agent(ok_body()).await;

    let tasks = vec![
        task(json!({"description": "no type", "parameters": {"repository": "r"}})),
        task(json!({"type": "terraform", "parameters": {"repository": "r"}})),
    ];

    for mode in MODES {
        let orchestrator = orchestrator_for(&ci, &helm, &deploy, Duration::from_secs(5), mode);
        let bundle = orchestrator.process_tasks(&tasks).await;

        assert_eq!(bundle.failed.len(), 2);
        assert_eq!(bundle.failed[0].error.as_deref(), Some(MISSING_AGENT_TYPE));
        assert_eq!(bundle.failed[1].error.as_deref(), Some(AGENT_UNAVAILABLE));
    }

    assert_eq!(ci.hits() + helm.hits() + deploy.hits(), 0);
}

#[tokio::test]
async fn test_concurrent_mode_overlaps_agent_calls() {
    let delay = Duration::from_millis(400);
    let ci = spawn_agent(StatusCode::OK, ok_body().to_string(), delay).await;
    let helm = spawn_agent(StatusCode::OK, ok_body().to_string(), delay).await;
    let deploy = spawn_agent(StatusCode::OK, ok_body().to_string(), delay).await;

    let tasks = vec![
        Task::new(TaskType::Deploy, "ship"),
        Task::new(TaskType::Ci, "pipeline"),
        Task::new(TaskType::Helm, "chart"),
    ];

    let orchestrator = orchestrator_for(
        &ci,
        &helm,
        &deploy,
        Duration::from_secs(5),
        ExecutionMode::Concurrent,
    );
    let started = Instant::now();
    let bundle = orchestrator.process_tasks(&tasks).await;

    assert!(started.elapsed() < delay * 3);
    assert_eq!(
        bundle.success.iter().map(|o| o.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}
