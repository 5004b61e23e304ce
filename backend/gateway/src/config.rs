//! Application configuration loaded from environment variables.

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint of the node serving the goal program
    pub rpc_url: String,
    /// Address of the deployed goal program
    pub program_id: String,
    /// Address receiving forfeited deposits (display only)
    pub charity_address: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to refresh tracked accounts from the chain
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            program_id: env_var("PROGRAM_ID").map_err(|_| {
                GatewayError::Config("PROGRAM_ID environment variable is required".to_string())
            })?,
            charity_address: env_var("CHARITY_ADDRESS")
                .unwrap_or_else(|_| "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb".to_string()),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./healthcommit.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| GatewayError::Config("Invalid API_PORT".to_string()))?,
            poll_interval_secs: env_var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| GatewayError::Config("Invalid POLL_INTERVAL_SECS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| GatewayError::Config(format!("Missing env var: {key}")))
}
