//! Typed client for the HealthCommit on-chain goal program.
//!
//! The program itself (goal lifecycle rules, fund custody, expiry
//! enforcement) runs externally; this crate covers the calling side:
//!
//! * [`goal`] — the goal snapshot model and its lifecycle status.
//! * [`projection`] — pure derivation of display state, remaining time,
//!   and eligible actions from a snapshot and the current time.
//! * [`category`] — decorative classification of goal descriptions.
//! * [`rpc`] — JSON-RPC reads and action dispatch against the program.

pub mod category;
pub mod errors;
pub mod goal;
pub mod projection;
pub mod rpc;

pub use category::GoalCategory;
pub use errors::{ChainError, Result};
pub use goal::{Goal, GoalStatus};
pub use projection::{project, ActionSet, GoalProjection};
pub use rpc::GoalAction;
