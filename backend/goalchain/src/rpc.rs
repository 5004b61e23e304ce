//! JSON-RPC client for the goal program — reads goal state and dispatches
//! owner actions.
//!
//! ## Resilience
//!
//! * Reads (`getUserGoals`, `getGoal`) retry transient failures — transport
//!   errors, rate limiting, soft RPC errors — with exponential back-off up to
//!   [`MAX_BACKOFF_SECS`] seconds and at most [`MAX_READ_ATTEMPTS`] attempts.
//! * Hard RPC errors (malformed request / unknown method / bad params) fail
//!   immediately.
//! * Action dispatch is sent exactly once.  Submissions are not idempotent;
//!   the caller decides whether to retry.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{ChainError, Result};
use crate::goal::Goal;

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_READ_ATTEMPTS: u32 = 4;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

// ─────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────

/// A state-changing request to the goal program.
///
/// The program enforces its own lifecycle rules on execution; this type only
/// names the call and carries its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalAction {
    /// Stake a deposit against a new commitment.
    Commit {
        description: String,
        duration_in_days: i64,
        /// Decimal string in the smallest currency unit.
        deposit_amount: String,
    },
    /// Declare a pending goal done before its deadline.
    MarkCompleted { goal_id: u64 },
    /// Reclaim the deposit of a completed goal.
    ClaimRefund { goal_id: u64 },
    /// Settle an expired, uncompleted goal to the charity address.
    FailGoal { goal_id: u64 },
}

impl GoalAction {
    /// Wire method name on the program interface.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Commit { .. } => "commitGoal",
            Self::MarkCompleted { .. } => "markCompleted",
            Self::ClaimRefund { .. } => "claimRefund",
            Self::FailGoal { .. } => "failGoal",
        }
    }

    /// Short identifier string for logs and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit { .. } => "commit_goal",
            Self::MarkCompleted { .. } => "mark_completed",
            Self::ClaimRefund { .. } => "claim_refund",
            Self::FailGoal { .. } => "fail_goal",
        }
    }

    fn params(&self, program_id: &str, account: &str) -> Value {
        match self {
            Self::Commit {
                description,
                duration_in_days,
                deposit_amount,
            } => json!({
                "programId": program_id,
                "account": account,
                "description": description,
                "durationInDays": duration_in_days,
                "depositAmount": deposit_amount,
            }),
            Self::MarkCompleted { goal_id }
            | Self::ClaimRefund { goal_id }
            | Self::FailGoal { goal_id } => json!({
                "programId": program_id,
                "account": account,
                "goalId": goal_id,
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch the identifiers of all goals owned by `account`.
pub async fn fetch_goal_ids(
    client: &Client,
    rpc_url: &str,
    program_id: &str,
    account: &str,
) -> Result<Vec<u64>> {
    let params = json!({ "programId": program_id, "account": account });
    let result = call_with_retry(client, rpc_url, "getUserGoals", params).await?;
    decode_goal_ids(&result)
}

/// Fetch the current snapshot of one goal.
pub async fn fetch_goal(
    client: &Client,
    rpc_url: &str,
    program_id: &str,
    goal_id: u64,
) -> Result<Goal> {
    let params = json!({ "programId": program_id, "goalId": goal_id });
    let result = call_with_retry(client, rpc_url, "getGoal", params).await?;
    decode_goal(goal_id, &result)
}

/// Submit an action on behalf of `account`.  Returns the transaction hash.
pub async fn dispatch_action(
    client: &Client,
    rpc_url: &str,
    program_id: &str,
    account: &str,
    action: &GoalAction,
) -> Result<String> {
    debug!("Dispatching {} for {account}", action.as_str());
    let result = call_once(client, rpc_url, action.method(), action.params(program_id, account))
        .await?;
    decode_tx_hash(&result)
}

// ─────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────

/// Perform one JSON-RPC call with no retries.
async fn call_once(client: &Client, rpc_url: &str, method: &str, params: Value) -> Result<Value> {
    let resp = client
        .post(rpc_url)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .send()
        .await?;

    let body: RpcResponse = resp.json().await?;

    if let Some(err) = body.error {
        return Err(ChainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    body.result
        .ok_or_else(|| ChainError::Decode(format!("Empty result from {method}")))
}

/// Perform a read call, retrying transient failures with exponential
/// back-off.  Hard RPC errors (codes -32600, -32601, -32602) and the final
/// attempt's failure are returned as-is.
async fn call_with_retry(
    client: &Client,
    rpc_url: &str,
    method: &str,
    params: Value,
) -> Result<Value> {
    let mut backoff = INITIAL_BACKOFF_SECS;
    let mut attempt = 1;

    loop {
        match call_once(client, rpc_url, method, params.clone()).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= MAX_READ_ATTEMPTS || !is_transient(&e) {
                    return Err(e);
                }
                warn!("{method} failed (will retry in {backoff}s): {e}");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                attempt += 1;
            }
        }
    }
}

fn is_transient(error: &ChainError) -> bool {
    match error {
        ChainError::Http(_) => true,
        // Request-shape errors cannot succeed on retry.
        ChainError::Rpc { code, .. } => !matches!(code, -32600 | -32601 | -32602),
        ChainError::Json(_) | ChainError::Decode(_) => false,
    }
}

// ─────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────

/// Decode a `getGoal` result into a [`Goal`].
///
/// Tolerant of source variance: field names in camelCase or snake_case,
/// amounts as JSON string or number, missing flags defaulting to false.
pub fn decode_goal(goal_id: u64, value: &Value) -> Result<Goal> {
    if !value.is_object() {
        return Err(ChainError::Decode(format!(
            "getGoal result for goal {goal_id} is not an object"
        )));
    }

    Ok(Goal {
        id: goal_id,
        owner: field_str(value, &["owner", "user"]).unwrap_or_default(),
        description: field_str(value, &["description"]).unwrap_or_default(),
        deposit_amount: field_str(value, &["depositAmount", "deposit_amount"])
            .unwrap_or_else(|| "0".to_string()),
        start_time: field_i64(value, &["startTime", "start_time"]).unwrap_or(0),
        duration_in_days: field_i64(value, &["durationInDays", "duration_in_days"]).unwrap_or(0),
        completed: field_bool(value, &["completed"]),
        refunded: field_bool(value, &["refunded"]),
        failed: field_bool(value, &["failed"]),
    })
}

/// Decode a `getUserGoals` result into goal identifiers.  Entries may be
/// numbers or numeric strings; anything else is skipped.
pub fn decode_goal_ids(value: &Value) -> Result<Vec<u64>> {
    let items = value
        .as_array()
        .ok_or_else(|| ChainError::Decode("getUserGoals result is not an array".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
        .collect())
}

fn decode_tx_hash(value: &Value) -> Result<String> {
    value
        .as_str()
        .map(String::from)
        .or_else(|| field_str(value, &["txHash", "tx_hash", "hash"]))
        .ok_or_else(|| ChainError::Decode("Missing transaction hash in dispatch result".to_string()))
}

fn field_str(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn field_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        if let Some(v) = value.get(key) {
            let parsed = v.as_i64().or_else(|| v.as_str()?.parse().ok());
            if parsed.is_some() {
                return parsed;
            }
        }
    }
    None
}

fn field_bool(value: &Value, keys: &[&str]) -> bool {
    for key in keys {
        if let Some(v) = value.get(key) {
            if let Some(b) = v.as_bool() {
                return b;
            }
            if let Some(n) = v.as_i64() {
                return n != 0;
            }
        }
    }
    false
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_goal_camel_case() {
        let value = json!({
            "user": "0xOWNER",
            "description": "Run 30 km in 10 days",
            "depositAmount": "100000000000000000",
            "startTime": 1_700_000_000_i64,
            "durationInDays": 10,
            "completed": false,
            "refunded": false,
            "failed": false,
        });

        let goal = decode_goal(7, &value).unwrap();
        assert_eq!(goal.id, 7);
        assert_eq!(goal.owner, "0xOWNER");
        assert_eq!(goal.deposit_amount, "100000000000000000");
        assert_eq!(goal.start_time, 1_700_000_000);
        assert_eq!(goal.duration_in_days, 10);
        assert!(!goal.completed);
    }

    #[test]
    fn decode_goal_snake_case_and_numeric_amount() {
        let value = json!({
            "owner": "0xOWNER",
            "description": "sleep 8 hours",
            "deposit_amount": 5_000,
            "start_time": "1700000000",
            "duration_in_days": "7",
            "completed": true,
        });

        let goal = decode_goal(2, &value).unwrap();
        assert_eq!(goal.deposit_amount, "5000");
        assert_eq!(goal.start_time, 1_700_000_000);
        assert_eq!(goal.duration_in_days, 7);
        assert!(goal.completed);
        // Missing flags default to false.
        assert!(!goal.refunded);
        assert!(!goal.failed);
    }

    #[test]
    fn decode_goal_rejects_non_object() {
        assert!(decode_goal(1, &json!("nope")).is_err());
        assert!(decode_goal(1, &json!(null)).is_err());
    }

    #[test]
    fn decode_ids_mixed_shapes() {
        let value = json!([1, "2", 3, "not-a-number", null]);
        assert_eq!(decode_goal_ids(&value).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn decode_ids_rejects_non_array() {
        assert!(decode_goal_ids(&json!({"ids": [1]})).is_err());
    }

    #[test]
    fn decode_tx_hash_shapes() {
        assert_eq!(decode_tx_hash(&json!("0xdeadbeef")).unwrap(), "0xdeadbeef");
        assert_eq!(decode_tx_hash(&json!({"txHash": "0xfeed"})).unwrap(), "0xfeed");
        assert!(decode_tx_hash(&json!({"status": "ok"})).is_err());
    }

    #[test]
    fn action_methods_and_labels() {
        let commit = GoalAction::Commit {
            description: "drink more water".to_string(),
            duration_in_days: 5,
            deposit_amount: "1000".to_string(),
        };
        assert_eq!(commit.method(), "commitGoal");
        assert_eq!(commit.as_str(), "commit_goal");
        assert_eq!(GoalAction::MarkCompleted { goal_id: 1 }.method(), "markCompleted");
        assert_eq!(GoalAction::ClaimRefund { goal_id: 1 }.method(), "claimRefund");
        assert_eq!(GoalAction::FailGoal { goal_id: 1 }.as_str(), "fail_goal");
    }

    #[test]
    fn commit_params_carry_the_full_triple() {
        let action = GoalAction::Commit {
            description: "eat better".to_string(),
            duration_in_days: 14,
            deposit_amount: "250000".to_string(),
        };
        let params = action.params("0xPROGRAM", "0xME");
        assert_eq!(params["programId"], "0xPROGRAM");
        assert_eq!(params["account"], "0xME");
        assert_eq!(params["description"], "eat better");
        assert_eq!(params["durationInDays"], 14);
        assert_eq!(params["depositAmount"], "250000");
    }

    #[test]
    fn goal_id_params() {
        let params = GoalAction::FailGoal { goal_id: 42 }.params("0xP", "0xME");
        assert_eq!(params["goalId"], 42);
        assert_eq!(params["account"], "0xME");
    }

    #[test]
    fn hard_rpc_errors_are_not_transient() {
        let hard = ChainError::Rpc { code: -32601, message: "no method".to_string() };
        let soft = ChainError::Rpc { code: -32000, message: "busy".to_string() };
        assert!(!is_transient(&hard));
        assert!(is_transient(&soft));
        assert!(!is_transient(&ChainError::Decode("bad".to_string())));
    }
}
