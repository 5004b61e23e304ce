//! Periodic re-evaluation of a goal's projection.
//!
//! A [`ProjectionWatcher`] owns a scheduled task that re-derives the
//! projection against wall-clock time on every tick and publishes it to a
//! watch channel.  The task is tied to the watcher's lifetime: dropping the
//! watcher cancels it, so no timer survives the teardown of the view that
//! created it.  Recomputation is idempotent — an early or late tick only
//! affects freshness, never correctness.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use goalchain::{project, Goal, GoalProjection};

/// Default re-evaluation cadence.  The countdown label changes at minute
/// granularity at most, so anything at or under a minute keeps the display
/// honest; one second matches the card it feeds.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

pub struct ProjectionWatcher {
    rx: watch::Receiver<GoalProjection>,
    cancel: CancellationToken,
}

impl ProjectionWatcher {
    /// Start watching a goal snapshot, recomputing its projection every
    /// `tick`.
    pub fn spawn(goal: Goal, tick: Duration) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(project(&goal, Utc::now().timestamp()));

        let token = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval completes immediately;
            // the constructor already published the initial projection.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let projection = project(&goal, Utc::now().timestamp());
                        if tx.send(projection).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { rx, cancel }
    }

    /// The most recently published projection.
    pub fn latest(&self) -> GoalProjection {
        self.rx.borrow().clone()
    }

    /// Wait for the next re-evaluation.  Returns false once the watcher has
    /// shut down.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// An additional receiver for the same projection stream.
    pub fn subscribe(&self) -> watch::Receiver<GoalProjection> {
        self.rx.clone()
    }
}

impl Drop for ProjectionWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalchain::GoalStatus;

    fn pending_goal() -> Goal {
        Goal {
            id: 1,
            owner: "0xabc".to_string(),
            description: "walk every day".to_string(),
            deposit_amount: "1000".to_string(),
            start_time: Utc::now().timestamp(),
            duration_in_days: 1,
            completed: false,
            refunded: false,
            failed: false,
        }
    }

    #[tokio::test]
    async fn publishes_an_initial_projection() {
        let watcher = ProjectionWatcher::spawn(pending_goal(), Duration::from_secs(60));
        let p = watcher.latest();
        assert_eq!(p.status, GoalStatus::Pending);
        assert!(!p.is_expired);
        assert!(p.actions.can_mark_completed);
    }

    #[tokio::test]
    async fn recomputes_on_tick() {
        let mut watcher = ProjectionWatcher::spawn(pending_goal(), Duration::from_millis(10));
        assert!(watcher.changed().await);
        let p = watcher.latest();
        assert_eq!(p.status, GoalStatus::Pending);
        assert!(p.remaining_seconds <= goalchain::projection::SECONDS_PER_DAY);
    }

    #[tokio::test]
    async fn drop_cancels_the_task() {
        let watcher = ProjectionWatcher::spawn(pending_goal(), Duration::from_millis(5));
        let mut rx = watcher.subscribe();
        drop(watcher);

        // The sender side shuts down once the cancel token fires.
        tokio::time::timeout(Duration::from_secs(2), async move {
            while rx.changed().await.is_ok() {}
        })
        .await
        .expect("watcher task did not stop after drop");
    }
}
