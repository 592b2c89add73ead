//! Batch dispatch and outcome aggregation.
//!
//! Every task gets exactly one dispatch attempt. Failures are contained per
//! task and never abort the batch; the returned [`ResultBundle`] lists each
//! task once, in submission order within the success and failed sequences.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ExecutionMode;
use crate::dispatcher::{AgentDispatch, DispatchError};
use crate::models::{
    AgentResponse, AgentStatus, ResultBundle, Task, TaskOutcome, AGENT_UNAVAILABLE,
    MISSING_AGENT_TYPE,
};

/// Error text for an agent-reported failure.
#[must_use]
pub fn agent_failure_message(agent_message: &str) -> String {
    format!("Agent execution failed: {agent_message}")
}

/// Map a dispatch result to an outcome.
///
/// Transport failures and contract violations both become
/// [`AGENT_UNAVAILABLE`]; `warning` replies stay on the success side with the
/// agent's message attached; `error` replies fail with the agent's message and
/// keep the reply (and its `details`) for diagnostics.
#[must_use]
pub fn classify(
    index: usize,
    task: Task,
    agent_type: &str,
    result: Result<AgentResponse, DispatchError>,
) -> TaskOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            warn!(
                task_index = index,
                agent_type = %agent_type,
                error = %e,
                "Agent unavailable"
            );
            return TaskOutcome::failed(index, task, None, AGENT_UNAVAILABLE);
        }
    };

    match response.status {
        AgentStatus::Success => {
            debug!(task_index = index, agent_type = %agent_type, "Task succeeded");
            TaskOutcome::success(index, task, response)
        }
        AgentStatus::Warning => {
            warn!(
                task_index = index,
                agent_type = %agent_type,
                message = %response.message,
                "Task completed with warning"
            );
            TaskOutcome::warning(index, task, response)
        }
        AgentStatus::Error => {
            let error = agent_failure_message(&response.message);
            warn!(
                task_index = index,
                agent_type = %agent_type,
                error = %error,
                "Agent reported failure"
            );
            TaskOutcome::failed(index, task, Some(response), error)
        }
    }
}

/// Reject a task with no declared type before any dispatch is attempted.
fn preflight(index: usize, task: &Task) -> Result<String, TaskOutcome> {
    task.declared_type().map(str::to_string).ok_or_else(|| {
        warn!(task_index = index, "Task has no agent type, not dispatching");
        TaskOutcome::failed(index, task.clone(), None, MISSING_AGENT_TYPE)
    })
}

/// Dispatches a batch of tasks and aggregates the outcomes.
///
/// Holds no per-call state, so one orchestrator can serve concurrent calls.
#[derive(Clone)]
pub struct TaskOrchestrator {
    dispatcher: Arc<dyn AgentDispatch>,
    mode: ExecutionMode,
}

impl TaskOrchestrator {
    /// Create an orchestrator using concurrent dispatch.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn AgentDispatch>) -> Self {
        Self {
            dispatcher,
            mode: ExecutionMode::default(),
        }
    }

    /// Select the execution mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Current execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Dispatch every task once and collect the outcomes.
    pub async fn process_tasks(&self, tasks: &[Task]) -> ResultBundle {
        info!(
            task_count = tasks.len(),
            mode = ?self.mode,
            "Processing tasks"
        );

        let outcomes = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(tasks).await,
            ExecutionMode::Concurrent => self.run_concurrent(tasks).await,
        };

        let bundle = ResultBundle::from_outcomes(outcomes);

        info!(
            success = bundle.success_count(),
            failed = bundle.failed_count(),
            warnings = bundle.warning_count(),
            "Task processing complete"
        );

        bundle
    }

    /// Dispatch and classify a single task.
    pub async fn dispatch_one(&self, task: &Task) -> TaskOutcome {
        match preflight(0, task) {
            Ok(agent_type) => {
                let result = self.dispatcher.route_task(&agent_type, task).await;
                classify(0, task.clone(), &agent_type, result)
            }
            Err(rejected) => rejected,
        }
    }

    async fn run_sequential(&self, tasks: &[Task]) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(tasks.len());

        for (index, task) in tasks.iter().enumerate() {
            let outcome = match preflight(index, task) {
                Ok(agent_type) => {
                    let result = self.dispatcher.route_task(&agent_type, task).await;
                    classify(index, task.clone(), &agent_type, result)
                }
                Err(rejected) => rejected,
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn run_concurrent(&self, tasks: &[Task]) -> Vec<TaskOutcome> {
        // One slot per submitted task; units write by index, never by completion order.
        let mut slots: Vec<Option<TaskOutcome>> = vec![None; tasks.len()];
        let mut handles = Vec::with_capacity(tasks.len());

        for (index, task) in tasks.iter().enumerate() {
            let agent_type = match preflight(index, task) {
                Ok(agent_type) => agent_type,
                Err(rejected) => {
                    slots[index] = Some(rejected);
                    continue;
                }
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let task = task.clone();
            let handle = tokio::spawn(async move {
                let result = dispatcher.route_task(&agent_type, &task).await;
                classify(index, task, &agent_type, result)
            });
            handles.push((index, handle));
        }

        for (index, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(task_index = index, error = %e, "Dispatch unit aborted");
                    TaskOutcome::failed(index, tasks[index].clone(), None, AGENT_UNAVAILABLE)
                }
            };
            slots[index] = Some(outcome);
        }

        slots.into_iter().flatten().collect()
    }
}
