//! # Goal model
//!
//! A [`Goal`] is a read-only snapshot of one commitment as stored by the
//! on-chain program.  This crate never mutates a goal; every state change
//! goes through [`crate::rpc::dispatch_action`] and is observed on the next
//! fetch.
//!
//! ## Status as a Finite-State Machine
//!
//! The program stores three booleans, but the lifecycle they encode is a
//! small forward-only machine:
//!
//! ```text
//! Pending ──► Completed ──► Refunded
//!     └─────► Failed
//! ```
//!
//! [`GoalStatus`] is the typed form of that machine.  The source flags are
//! kept on the snapshot verbatim (the program owns them); everything derived
//! in this crate goes through [`GoalStatus::from_flags`], which resolves
//! inconsistent flag combinations by a fixed precedence instead of trusting
//! the source to uphold its own invariants.

use serde::{Deserialize, Serialize};

/// Snapshot of a single goal, as returned by the program's `getGoal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Identifier assigned by the program, unique per owning account.
    pub id: u64,
    /// Owning account (opaque address string).
    pub owner: String,
    /// Free-text commitment, display only.
    pub description: String,
    /// Staked amount in the smallest currency unit, as a decimal string.
    /// Opaque to all logic in this crate.
    pub deposit_amount: String,
    /// Unix seconds at creation; immutable.
    pub start_time: i64,
    /// Commitment window in whole days; immutable.
    pub duration_in_days: i64,
    pub completed: bool,
    pub refunded: bool,
    pub failed: bool,
}

impl Goal {
    /// Derived lifecycle status of this snapshot.
    pub fn status(&self) -> GoalStatus {
        GoalStatus::from_flags(self.completed, self.refunded, self.failed)
    }
}

/// Lifecycle status of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Committed, neither completed nor expired-and-failed.
    Pending,
    /// Marked complete by the owner; refund claimable.
    Completed,
    /// Deposit returned to the owner.
    Refunded,
    /// Expired without completion; deposit forfeited to charity.
    Failed,
}

impl GoalStatus {
    /// Resolve the program's raw flags into a single status.
    ///
    /// Precedence, first match wins: refunded, then failed, then completed.
    /// Terminal flags dominate so that an inconsistent source snapshot
    /// (e.g. both `completed` and `failed` set) still yields an unambiguous
    /// display state and an empty action set.
    pub fn from_flags(completed: bool, refunded: bool, failed: bool) -> Self {
        if refunded {
            Self::Refunded
        } else if failed {
            Self::Failed
        } else if completed {
            Self::Completed
        } else {
            Self::Pending
        }
    }

    /// Short identifier string suitable for storage and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
        }
    }

    /// A settled goal has left the active set: its deposit was either
    /// returned or forfeited.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Refunded | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_precedence() {
        assert_eq!(GoalStatus::from_flags(false, false, false), GoalStatus::Pending);
        assert_eq!(GoalStatus::from_flags(true, false, false), GoalStatus::Completed);
        assert_eq!(GoalStatus::from_flags(true, true, false), GoalStatus::Refunded);
        assert_eq!(GoalStatus::from_flags(false, false, true), GoalStatus::Failed);
    }

    #[test]
    fn refunded_dominates_every_combination() {
        for completed in [false, true] {
            for failed in [false, true] {
                assert_eq!(
                    GoalStatus::from_flags(completed, true, failed),
                    GoalStatus::Refunded
                );
            }
        }
    }

    #[test]
    fn failed_dominates_completed() {
        assert_eq!(GoalStatus::from_flags(true, false, true), GoalStatus::Failed);
    }

    #[test]
    fn settled_statuses() {
        assert!(GoalStatus::Refunded.is_settled());
        assert!(GoalStatus::Failed.is_settled());
        assert!(!GoalStatus::Pending.is_settled());
        assert!(!GoalStatus::Completed.is_settled());
    }

    #[test]
    fn status_as_str() {
        assert_eq!(GoalStatus::Pending.as_str(), "pending");
        assert_eq!(GoalStatus::Completed.as_str(), "completed");
        assert_eq!(GoalStatus::Refunded.as_str(), "refunded");
        assert_eq!(GoalStatus::Failed.as_str(), "failed");
    }
}
