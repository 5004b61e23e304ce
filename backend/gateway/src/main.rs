//! HealthCommit goal gateway — entry point.
//!
//! Starts a background refresher task that polls the goal program over
//! JSON-RPC and persists goal snapshots to SQLite.  Simultaneously exposes
//! an Axum REST/SSE API serving each goal's status projection for a browser
//! client to render.

mod api;
mod config;
mod db;
mod errors;
mod refresher;
mod watch;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use refresher::RefresherState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client shared between the refresher and the API handlers.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    // ─── Background refresher ─────────────────────────────
    let refresher_state = Arc::new(RefresherState {
        pool: pool.clone(),
        config: config.clone(),
        client: client.clone(),
    });
    tokio::spawn(refresher::run(refresher_state));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState {
        pool,
        config: config.clone(),
        client,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/info", get(api::info))
        .route(
            "/accounts/:account/goals",
            get(api::get_account_goals).post(api::commit_goal),
        )
        .route("/accounts/:account/history", get(api::get_account_history))
        .route("/accounts/:account/goals/:id/complete", post(api::mark_completed))
        .route("/accounts/:account/goals/:id/refund", post(api::claim_refund))
        .route("/accounts/:account/goals/:id/fail", post(api::fail_goal))
        .route("/accounts/:account/goals/:id/watch", get(api::watch_goal))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
