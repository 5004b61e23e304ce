//! Long-running background task that re-fetches goal state for every
//! tracked account and writes the snapshots to the database.
//!
//! Chain reads are eventually consistent; the cache a handler serves is at
//! most one poll interval stale, and user-triggered actions re-fetch their
//! account immediately via [`refresh_account`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use chrono::Utc;
use goalchain::rpc;

use crate::config::Config;
use crate::db;
use crate::errors::Result;

pub struct RefresherState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

/// Spawn the refresh loop as a background [`tokio`] task.
pub async fn run(state: Arc<RefresherState>) {
    info!("Goal refresher starting — program: {}", state.config.program_id);

    loop {
        match refresh_all(&state).await {
            Ok(refreshed) if refreshed > 0 => {
                info!("Refreshed {refreshed} goal snapshots");
            }
            Ok(_) => {}
            Err(e) => {
                error!("Refresh pass error: {e}");
            }
        }

        tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)).await;
    }
}

/// Perform a single refresh pass over every tracked account.
///
/// A failing account is logged and skipped so one bad read cannot starve
/// the others.
async fn refresh_all(state: &RefresherState) -> Result<usize> {
    let accounts = db::list_tracked_accounts(&state.pool).await?;
    let mut refreshed = 0usize;

    for account in &accounts {
        match refresh_account(&state.pool, &state.client, &state.config, account).await {
            Ok(count) => refreshed += count,
            Err(e) => warn!("Skipping account {account} this pass: {e}"),
        }
    }

    Ok(refreshed)
}

/// Re-fetch every goal owned by `account` and upsert the snapshots.
/// Returns the number of goals written.
pub async fn refresh_account(
    pool: &SqlitePool,
    client: &Client,
    config: &Config,
    account: &str,
) -> Result<usize> {
    let ids = rpc::fetch_goal_ids(client, &config.rpc_url, &config.program_id, account).await?;

    let now = Utc::now().timestamp();
    let mut written = 0usize;
    for id in ids {
        let goal = rpc::fetch_goal(client, &config.rpc_url, &config.program_id, id).await?;
        db::upsert_goal(pool, account, &goal, now).await?;
        written += 1;
    }

    Ok(written)
}
