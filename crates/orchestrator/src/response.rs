//! Agent response contract validation.
//!
//! A reply is accepted only if it is a JSON object with a `status` in
//! {`success`, `error`, `warning`} and a string `message`. `details` is
//! optional; when present it must be an object (or `null`). Malformed replies
//! are rejected whole, never partially repaired.

use serde_json::Value;
use thiserror::Error;

use crate::models::{AgentResponse, AgentStatus};

/// Fields every agent response must carry.
pub const REQUIRED_FIELDS: [&str; 2] = ["status", "message"];

/// Status values an agent may report.
pub const ALLOWED_STATUSES: [&str; 3] = ["success", "error", "warning"];

/// Ways an agent reply can break the response contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// Body is not a JSON object
    #[error("response is not a JSON object")]
    NotAnObject,

    /// A required field is absent
    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),

    /// Status is not one of the allowed values
    #[error("response has unsupported status {0}")]
    InvalidStatus(String),

    /// Message is not a string
    #[error("response field `message` is not a string")]
    InvalidMessage,

    /// Details is present but not an object
    #[error("response field `details` is not an object")]
    InvalidDetails,
}

/// Boolean form of the contract check.
#[must_use]
pub fn is_valid_response(value: &Value) -> bool {
    validate_agent_response(value.clone()).is_ok()
}

/// Check a raw reply against the contract and build the typed response.
pub fn validate_agent_response(value: Value) -> Result<AgentResponse, ContractViolation> {
    let Value::Object(mut fields) = value else {
        return Err(ContractViolation::NotAnObject);
    };

    for field in REQUIRED_FIELDS {
        if !fields.contains_key(field) {
            return Err(ContractViolation::MissingField(field));
        }
    }

    let status = match fields.remove("status") {
        Some(Value::String(raw)) => raw
            .parse::<AgentStatus>()
            .map_err(|s| ContractViolation::InvalidStatus(format!("`{s}`")))?,
        Some(other) => return Err(ContractViolation::InvalidStatus(other.to_string())),
        None => return Err(ContractViolation::MissingField("status")),
    };

    let message = match fields.remove("message") {
        Some(Value::String(message)) => message,
        Some(_) => return Err(ContractViolation::InvalidMessage),
        None => return Err(ContractViolation::MissingField("message")),
    };

    let details = match fields.remove("details") {
        None | Some(Value::Null) => None,
        Some(Value::Object(details)) => Some(details),
        Some(_) => return Err(ContractViolation::InvalidDetails),
    };

    Ok(AgentResponse {
        status,
        message,
        details,
        extra: fields,
    })
}
