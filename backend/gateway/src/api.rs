//! Axum REST + SSE handlers.
//!
//! Every goal in a response carries its full projection (status, countdown,
//! category, eligible actions) computed against the wall clock at serve
//! time; the `/watch` endpoint keeps re-computing it for as long as the
//! client stays connected.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use futures::stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

use goalchain::{project, rpc, ActionSet, Goal, GoalAction, GoalStatus};

use crate::config::Config;
use crate::db::{self, GoalRow};
use crate::refresher;
use crate::watch::{ProjectionWatcher, DEFAULT_TICK};

pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

pub(crate) fn unix_now() -> i64 {
    Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

/// One goal as rendered on the dashboard: the raw snapshot fields plus the
/// derived projection, flattened the way the card consumes them.
#[derive(Debug, Serialize)]
pub struct GoalView {
    pub id: u64,
    pub description: String,
    pub deposit_amount: String,
    pub start_time: i64,
    pub duration_in_days: i64,
    pub status: GoalStatus,
    pub emoji: &'static str,
    pub category: &'static str,
    pub remaining: String,
    pub remaining_seconds: i64,
    pub is_expired: bool,
    pub can_mark_completed: bool,
    pub can_claim_refund: bool,
    pub can_fail: bool,
}

impl GoalView {
    pub fn from_goal(goal: &Goal, now: i64) -> Self {
        let p = project(goal, now);
        Self {
            id: goal.id,
            description: goal.description.clone(),
            deposit_amount: goal.deposit_amount.clone(),
            start_time: goal.start_time,
            duration_in_days: goal.duration_in_days,
            status: p.status,
            emoji: p.category.emoji(),
            category: p.category.as_str(),
            remaining: p.remaining,
            remaining_seconds: p.remaining_seconds,
            is_expired: p.is_expired,
            can_mark_completed: p.actions.can_mark_completed,
            can_claim_refund: p.actions.can_claim_refund,
            can_fail: p.actions.can_fail,
        }
    }
}

/// One settled goal in the history view.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub description: String,
    pub deposit_amount: String,
    pub status: GoalStatus,
    /// Where the deposit went: `refunded` or `sent_to_charity`.
    pub outcome: &'static str,
    /// Date of the settling snapshot, `YYYY-MM-DD`.
    pub settled_on: String,
}

impl HistoryEntry {
    fn from_row(row: &GoalRow) -> Self {
        let goal = row.to_goal();
        let status = goal.status();
        Self {
            id: goal.id,
            description: goal.description,
            deposit_amount: goal.deposit_amount,
            status,
            outcome: outcome_label(status),
            settled_on: settled_date(row.updated_at),
        }
    }
}

fn outcome_label(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Refunded => "refunded",
        _ => "sent_to_charity",
    }
}

fn settled_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[derive(Serialize)]
pub struct GoalsResponse {
    pub account: String,
    pub count: usize,
    pub goals: Vec<GoalView>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub account: String,
    pub count: usize,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Serialize)]
pub struct ActionResponse {
    pub action: &'static str,
    pub tx_hash: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct InfoResponse {
    pub program_id: String,
    pub charity_address: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl std::fmt::Display) -> Response {
    (status, Json(ErrorResponse { error: error.to_string() })).into_response()
}

// ─────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CommitGoalRequest {
    pub description: String,
    pub duration_in_days: i64,
    /// Decimal string in the smallest currency unit.
    pub deposit_amount: String,
}

impl CommitGoalRequest {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("Goal description is required".to_string());
        }
        if self.duration_in_days < 1 {
            return Err("Duration must be a positive whole number of days".to_string());
        }
        match self.deposit_amount.parse::<u128>() {
            Ok(amount) if amount > 0 => Ok(()),
            _ => Err("Deposit amount must be a positive integer string".to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /info`
///
/// Static deployment facts the dashboard displays: the goal program address
/// and the charity receiving forfeited deposits.
pub async fn info(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(InfoResponse {
        program_id: state.config.program_id.clone(),
        charity_address: state.config.charity_address.clone(),
    })
}

/// `GET /accounts/:account/goals`
///
/// Active goals (everything not yet refunded or failed) with their
/// projections.  The account becomes tracked on first query; the chain is
/// re-fetched best-effort, falling back to the cached snapshots.
pub async fn get_account_goals(
    State(state): State<Arc<ApiState>>,
    Path(account): Path<String>,
) -> Response {
    if let Err(e) = db::track_account(&state.pool, &account, unix_now()).await {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e);
    }

    if let Err(e) =
        refresher::refresh_account(&state.pool, &state.client, &state.config, &account).await
    {
        warn!("Serving cached goals for {account}: {e}");
    }

    match db::get_active_goals(&state.pool, &account).await {
        Ok(rows) => {
            let now = unix_now();
            let goals: Vec<GoalView> = rows
                .iter()
                .map(|row| GoalView::from_goal(&row.to_goal(), now))
                .collect();
            (
                StatusCode::OK,
                Json(GoalsResponse {
                    account,
                    count: goals.len(),
                    goals,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// `GET /accounts/:account/history`
///
/// Settled goals (deposit refunded or forfeited), newest first.
pub async fn get_account_history(
    State(state): State<Arc<ApiState>>,
    Path(account): Path<String>,
) -> Response {
    if let Err(e) =
        refresher::refresh_account(&state.pool, &state.client, &state.config, &account).await
    {
        warn!("Serving cached history for {account}: {e}");
    }

    match db::get_settled_goals(&state.pool, &account).await {
        Ok(rows) => {
            let entries: Vec<HistoryEntry> = rows.iter().map(HistoryEntry::from_row).collect();
            (
                StatusCode::OK,
                Json(HistoryResponse {
                    account,
                    count: entries.len(),
                    entries,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// `POST /accounts/:account/goals`
///
/// Commit a new goal: stake `deposit_amount` against `description` for
/// `duration_in_days`.
pub async fn commit_goal(
    State(state): State<Arc<ApiState>>,
    Path(account): Path<String>,
    Json(req): Json<CommitGoalRequest>,
) -> Response {
    if let Err(msg) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, msg);
    }

    let action = GoalAction::Commit {
        description: req.description.trim().to_string(),
        duration_in_days: req.duration_in_days,
        deposit_amount: req.deposit_amount,
    };

    dispatch_and_refresh(&state, account, action).await
}

/// `POST /accounts/:account/goals/:id/complete`
pub async fn mark_completed(
    State(state): State<Arc<ApiState>>,
    Path((account, goal_id)): Path<(String, u64)>,
) -> Response {
    act_on_goal(
        &state,
        account,
        goal_id,
        |a| a.can_mark_completed,
        GoalAction::MarkCompleted { goal_id },
    )
    .await
}

/// `POST /accounts/:account/goals/:id/refund`
pub async fn claim_refund(
    State(state): State<Arc<ApiState>>,
    Path((account, goal_id)): Path<(String, u64)>,
) -> Response {
    act_on_goal(
        &state,
        account,
        goal_id,
        |a| a.can_claim_refund,
        GoalAction::ClaimRefund { goal_id },
    )
    .await
}

/// `POST /accounts/:account/goals/:id/fail`
pub async fn fail_goal(
    State(state): State<Arc<ApiState>>,
    Path((account, goal_id)): Path<(String, u64)>,
) -> Response {
    act_on_goal(
        &state,
        account,
        goal_id,
        |a| a.can_fail,
        GoalAction::FailGoal { goal_id },
    )
    .await
}

/// `GET /accounts/:account/goals/:id/watch`
///
/// SSE stream of the goal's projection, re-evaluated once per second until
/// the client disconnects (which cancels the watcher).
pub async fn watch_goal(
    State(state): State<Arc<ApiState>>,
    Path((account, goal_id)): Path<(String, u64)>,
) -> Response {
    let goal = match rpc::fetch_goal(
        &state.client,
        &state.config.rpc_url,
        &state.config.program_id,
        goal_id,
    )
    .await
    {
        Ok(goal) => goal,
        Err(e) => return error_response(StatusCode::BAD_GATEWAY, e),
    };

    if !goal.owner.eq_ignore_ascii_case(&account) {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Goal {goal_id} not found for {account}"),
        );
    }

    let watcher = ProjectionWatcher::spawn(goal, DEFAULT_TICK);

    // First yield the current projection, then one event per re-evaluation.
    let stream = stream::unfold((watcher, true), |(mut watcher, first)| async move {
        if !first && !watcher.changed().await {
            return None;
        }
        let event = Event::default().json_data(&watcher.latest()).ok()?;
        Some((Ok::<_, Infallible>(event), (watcher, false)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

// ─────────────────────────────────────────────────────────
// Action plumbing
// ─────────────────────────────────────────────────────────

/// Re-fetch the goal, verify ownership and eligibility, then dispatch.
///
/// Eligibility is decided here from the fresh snapshot's projection; the
/// program enforces the same rules on execution, so a 409 is advisory and a
/// race with expiry simply surfaces as a rejected transaction.
async fn act_on_goal(
    state: &ApiState,
    account: String,
    goal_id: u64,
    select: fn(&ActionSet) -> bool,
    action: GoalAction,
) -> Response {
    let cfg = &state.config;

    let goal = match rpc::fetch_goal(&state.client, &cfg.rpc_url, &cfg.program_id, goal_id).await {
        Ok(goal) => goal,
        Err(e) => return error_response(StatusCode::BAD_GATEWAY, e),
    };

    if !goal.owner.eq_ignore_ascii_case(&account) {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Goal {goal_id} not found for {account}"),
        );
    }

    let projection = project(&goal, unix_now());
    if !select(&projection.actions) {
        return error_response(
            StatusCode::CONFLICT,
            format!(
                "{} is not currently offered for goal {goal_id} (status: {}, {})",
                action.as_str(),
                projection.status.as_str(),
                projection.remaining,
            ),
        );
    }

    dispatch_and_refresh(state, account, action).await
}

async fn dispatch_and_refresh(state: &ApiState, account: String, action: GoalAction) -> Response {
    let cfg = &state.config;

    match rpc::dispatch_action(&state.client, &cfg.rpc_url, &cfg.program_id, &account, &action)
        .await
    {
        Ok(tx_hash) => {
            if let Err(e) = db::track_account(&state.pool, &account, unix_now()).await {
                warn!("Could not track account {account}: {e}");
            }
            // Chain reads are eventually consistent; refresh what we can now
            // and let the poller pick up the rest.
            if let Err(e) =
                refresher::refresh_account(&state.pool, &state.client, cfg, &account).await
            {
                warn!("Post-action refresh failed for {account}: {e}");
            }
            (
                StatusCode::OK,
                Json(ActionResponse {
                    action: action.as_str(),
                    tx_hash,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn request(description: &str, duration: i64, deposit: &str) -> CommitGoalRequest {
        CommitGoalRequest {
            description: description.to_string(),
            duration_in_days: duration,
            deposit_amount: deposit.to_string(),
        }
    }

    #[test]
    fn commit_validation_accepts_the_dashboard_example() {
        assert!(request("Run 30 km in 10 days", 10, "100000000000000000").validate().is_ok());
    }

    #[test]
    fn commit_validation_rejects_blank_description() {
        assert!(request("", 10, "1000").validate().is_err());
        assert!(request("   ", 10, "1000").validate().is_err());
    }

    #[test]
    fn commit_validation_rejects_non_positive_duration() {
        assert!(request("walk daily", 0, "1000").validate().is_err());
        assert!(request("walk daily", -5, "1000").validate().is_err());
    }

    #[test]
    fn commit_validation_rejects_bad_deposits() {
        assert!(request("walk daily", 7, "0").validate().is_err());
        assert!(request("walk daily", 7, "-10").validate().is_err());
        assert!(request("walk daily", 7, "0.1").validate().is_err());
        assert!(request("walk daily", 7, "lots").validate().is_err());
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(outcome_label(GoalStatus::Refunded), "refunded");
        assert_eq!(outcome_label(GoalStatus::Failed), "sent_to_charity");
    }

    #[test]
    fn settled_date_formats_as_day() {
        assert_eq!(settled_date(1_705_276_800), "2024-01-15");
    }

    #[test]
    fn goal_view_flattens_the_projection() {
        let goal = Goal {
            id: 3,
            owner: "0xabc".to_string(),
            description: "gym 4x a week".to_string(),
            deposit_amount: "5000".to_string(),
            start_time: 1_700_000_000,
            duration_in_days: 10,
            completed: false,
            refunded: false,
            failed: false,
        };
        let view = GoalView::from_goal(&goal, 1_700_000_000 + 86_400);
        assert_eq!(view.status, GoalStatus::Pending);
        assert_eq!(view.emoji, "💪");
        assert_eq!(view.category, "strength");
        assert_eq!(view.remaining, "9d 0h");
        assert!(view.can_mark_completed);
        assert!(!view.can_claim_refund);
        assert!(!view.can_fail);
    }
}
