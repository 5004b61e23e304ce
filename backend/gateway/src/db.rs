//! Database layer — migrations, snapshot upserts, and queries.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use goalchain::Goal;

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// A goal snapshot row as stored in / read from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GoalRow {
    pub account: String,
    pub goal_id: i64,
    pub description: String,
    pub deposit_amount: String,
    pub start_time: i64,
    pub duration_in_days: i64,
    pub completed: bool,
    pub refunded: bool,
    pub failed: bool,
    pub updated_at: i64,
}

impl GoalRow {
    pub fn to_goal(&self) -> Goal {
        Goal {
            id: self.goal_id.max(0) as u64,
            owner: self.account.clone(),
            description: self.description.clone(),
            deposit_amount: self.deposit_amount.clone(),
            start_time: self.start_time,
            duration_in_days: self.duration_in_days,
            completed: self.completed,
            refunded: self.refunded,
            failed: self.failed,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Tracked accounts
// ─────────────────────────────────────────────────────────

/// Mark an account for background refresh.  Idempotent.
pub async fn track_account(pool: &SqlitePool, account: &str, now: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO tracked_accounts (account, added_at) VALUES (?1, ?2)")
        .bind(account)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_tracked_accounts(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT account FROM tracked_accounts ORDER BY added_at ASC")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(a,)| a).collect())
}

// ─────────────────────────────────────────────────────────
// Snapshot writes
// ─────────────────────────────────────────────────────────

/// Persist the latest snapshot of a goal.  Re-writing the same snapshot is
/// harmless; the row always reflects the most recent fetch.
pub async fn upsert_goal(pool: &SqlitePool, account: &str, goal: &Goal, now: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO goals
            (account, goal_id, description, deposit_amount, start_time,
             duration_in_days, completed, refunded, failed, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT (account, goal_id) DO UPDATE SET
            description      = excluded.description,
            deposit_amount   = excluded.deposit_amount,
            start_time       = excluded.start_time,
            duration_in_days = excluded.duration_in_days,
            completed        = excluded.completed,
            refunded         = excluded.refunded,
            failed           = excluded.failed,
            updated_at       = excluded.updated_at
        "#,
    )
    .bind(account)
    .bind(goal.id as i64)
    .bind(&goal.description)
    .bind(&goal.deposit_amount)
    .bind(goal.start_time)
    .bind(goal.duration_in_days)
    .bind(goal.completed)
    .bind(goal.refunded)
    .bind(goal.failed)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Snapshot reads
// ─────────────────────────────────────────────────────────

/// Goals still shown on the dashboard: everything except refunded and failed
/// ones (completed goals stay visible until the refund is claimed).
pub async fn get_active_goals(pool: &SqlitePool, account: &str) -> Result<Vec<GoalRow>> {
    let rows = sqlx::query_as::<_, GoalRow>(
        r#"
        SELECT account, goal_id, description, deposit_amount, start_time,
               duration_in_days, completed, refunded, failed, updated_at
        FROM   goals
        WHERE  account = ?1 AND refunded = 0 AND failed = 0
        ORDER  BY goal_id ASC
        "#,
    )
    .bind(account)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Settled goals for the history view, newest first.
pub async fn get_settled_goals(pool: &SqlitePool, account: &str) -> Result<Vec<GoalRow>> {
    let rows = sqlx::query_as::<_, GoalRow>(
        r#"
        SELECT account, goal_id, description, deposit_amount, start_time,
               duration_in_days, completed, refunded, failed, updated_at
        FROM   goals
        WHERE  account = ?1 AND (refunded = 1 OR failed = 1)
        ORDER  BY updated_at DESC, goal_id DESC
        "#,
    )
    .bind(account)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
