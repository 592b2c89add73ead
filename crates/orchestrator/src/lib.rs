//! Task orchestration core for DevOps automation agents.
//!
//! This crate provides:
//! - Task, agent response and outcome types
//! - Per-type parameter requirements and author feedback
//! - Agent response contract validation
//! - HTTP dispatch to the CI, Helm and deploy agents
//! - Batch orchestration with per-task failure isolation

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod dispatcher;
pub mod models;
pub mod orchestrator;
pub mod requirements;
pub mod response;

pub use config::{AgentEndpoints, ExecutionMode};
pub use dispatcher::{AgentDispatch, AgentDispatcher, DispatchError};
pub use models::*;
pub use orchestrator::{classify, TaskOrchestrator};
pub use requirements::{TaskValidation, TaskValidator, ValidationReport};
pub use response::{is_valid_response, validate_agent_response, ContractViolation};
