//! # Goal status projection
//!
//! Pure derivation of everything a display surface needs for one goal:
//! lifecycle status, remaining time, expiry, decorative category, and the
//! set of actions the owner may currently take.
//!
//! Every function here is total: any combination of flags and any integer
//! timestamps produce a defined output.  Degenerate inputs (zero or negative
//! durations, timestamps far outside the plausible range) clamp to
//! `remaining = 0` / expired rather than failing.  No I/O, no side effects;
//! `now` is always supplied by the caller.

use serde::Serialize;

use crate::category::GoalCategory;
use crate::goal::{Goal, GoalStatus};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Unix second at which the goal's commitment window closes.
pub fn end_time(goal: &Goal) -> i64 {
    goal.start_time
        .saturating_add(goal.duration_in_days.saturating_mul(SECONDS_PER_DAY))
}

/// Seconds left before expiry, clamped at zero.
///
/// A non-positive `duration_in_days` is treated as an already-closed window,
/// regardless of `start_time`.
pub fn remaining_seconds(goal: &Goal, now: i64) -> i64 {
    if goal.duration_in_days <= 0 {
        return 0;
    }
    end_time(goal).saturating_sub(now).max(0)
}

/// True once the commitment window has closed.
pub fn is_expired(goal: &Goal, now: i64) -> bool {
    remaining_seconds(goal, now) == 0
}

/// Format a remaining-seconds value as the largest two non-zero units among
/// days, hours, and minutes: `"2d 5h"`, `"3h 20m"`, `"45m"`.  Values under a
/// minute render as `"0m"`; zero and below render as `"Expired"`.
pub fn format_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        return "Expired".to_string();
    }

    let days = seconds / SECONDS_PER_DAY;
    let hours = (seconds % SECONDS_PER_DAY) / 3_600;
    let mins = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Which actions the owner may currently take on a goal.
///
/// At most one of the three is true for any input: expiry partitions
/// mark-completed from fail-goal, and claim-refund requires a status
/// (completed, not yet settled) under which the other two are false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSet {
    /// Owner may declare the goal done before expiry.
    pub can_mark_completed: bool,
    /// Owner may reclaim the deposit of a completed goal.
    pub can_claim_refund: bool,
    /// Anyone may settle an expired, uncompleted goal to charity.
    pub can_fail: bool,
}

impl ActionSet {
    /// No action currently offered.
    pub fn none() -> Self {
        Self {
            can_mark_completed: false,
            can_claim_refund: false,
            can_fail: false,
        }
    }
}

/// Derive the eligible actions for a goal at time `now`.
pub fn eligible_actions(goal: &Goal, now: i64) -> ActionSet {
    let expired = is_expired(goal, now);
    let open = !goal.completed && !goal.failed && !goal.refunded;
    ActionSet {
        can_mark_completed: open && !expired,
        can_claim_refund: goal.completed && !goal.refunded && !goal.failed,
        can_fail: open && expired,
    }
}

/// The full derived view of one goal at time `now`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProjection {
    pub status: GoalStatus,
    pub remaining_seconds: i64,
    /// Human label: `"2d 5h"`, `"45m"`, or `"Expired"`.
    pub remaining: String,
    pub is_expired: bool,
    pub category: GoalCategory,
    pub actions: ActionSet,
}

/// Project a goal snapshot to its display state at time `now`.
pub fn project(goal: &Goal, now: i64) -> GoalProjection {
    let remaining = remaining_seconds(goal, now);
    GoalProjection {
        status: goal.status(),
        remaining_seconds: remaining,
        remaining: format_remaining(remaining),
        is_expired: remaining == 0,
        category: GoalCategory::from_description(&goal.description),
        actions: eligible_actions(goal, now),
    }
}
