//! Jira-facing gateway for the DevOps automation agents.
//!
//! This crate provides:
//! - Jira webhook payload checks and signature verification
//! - REST client for Jira comments, transitions and issue creation
//! - LLM-backed extraction of tasks from issue descriptions
//! - In-memory log of recent gateway activity
//! - HTTP server wiring all of the above to the task orchestrator

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod config;
pub mod events;
pub mod jira;
pub mod parser;
pub mod report;
pub mod server;
pub mod webhooks;

pub use config::Config;
pub use events::{EventKind, EventLog, SystemEvent};
pub use jira::{IssueTracker, JiraClient, NewIssue};
pub use parser::{OpenAiTaskParser, ParseError, ParsedDescription, TaskParser};
pub use report::{failure_description, format_status_report};
pub use webhooks::{extract_issue, verify_webhook_signature, WebhookIssue};
