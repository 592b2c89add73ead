//! Jira webhook payload checks and signature verification.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// Team whose issues are processed.
pub const DEVOPS_TEAM: &str = "devops";

/// Verify a Jira webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Header value, `sha256=<hex>` or bare hex
/// * `secret` - Webhook signing secret
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let hex_digest = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(signature_bytes) = hex::decode(hex_digest.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Compute the `sha256=<hex>` header value for a body.
#[must_use]
pub fn sign_payload(body: &[u8], secret: &str) -> String {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Why a webhook payload was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadRejection {
    /// No `issue` object
    #[error("payload has no issue")]
    MissingIssue,
    /// `issue.fields` absent or empty
    #[error("issue has no fields")]
    MissingFields,
    /// Team is absent or not the DevOps team
    #[error("issue is not assigned to the devops team (team: {0:?})")]
    WrongTeam(Option<String>),
    /// Description absent or empty
    #[error("issue has no description")]
    MissingDescription,
    /// Issue key absent
    #[error("issue has no key")]
    MissingKey,
}

/// The parts of a Jira issue event the gateway acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookIssue {
    /// Issue key, e.g. `OPS-42`
    pub key: String,
    /// Issue description text
    pub description: String,
}

/// Accept only DevOps-team issues that carry a description.
///
/// The team is read from `fields.customfield_team`, falling back to
/// `fields.team`, and compared case-insensitively.
pub fn extract_issue(payload: &Value) -> Result<WebhookIssue, PayloadRejection> {
    let issue = payload
        .get("issue")
        .filter(|v| is_present(v))
        .ok_or(PayloadRejection::MissingIssue)?;

    let fields = issue
        .get("fields")
        .and_then(Value::as_object)
        .filter(|f| !f.is_empty())
        .ok_or(PayloadRejection::MissingFields)?;

    let team = ["customfield_team", "team"]
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|t| !t.is_empty());
    if !team.is_some_and(|t| t.eq_ignore_ascii_case(DEVOPS_TEAM)) {
        return Err(PayloadRejection::WrongTeam(team.map(str::to_string)));
    }

    let description = fields
        .get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .ok_or(PayloadRejection::MissingDescription)?;

    let key = issue
        .get("key")
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .ok_or(PayloadRejection::MissingKey)?;

    Ok(WebhookIssue {
        key: key.to_string(),
        description: description.to_string(),
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
