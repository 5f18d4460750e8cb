//! Print the most searched terms stored in Appwrite as pretty JSON.
//! Usage:
//!   cargo run --bin top_searches -- [limit]
//! Uses APPWRITE_PROJECT_ID, APPWRITE_DATABASE_ID and APPWRITE_COLLECTION_ID from
//! the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use reelfinder::appwrite::AppwriteClient;
use reelfinder::config::{Config, StoreConfig};
use reelfinder::counters::{SearchCounters, DEFAULT_TOP_LIMIT};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let limit = match env::args().nth(1) {
        Some(raw) => raw.parse::<usize>().context("limit must be a positive number")?,
        None => DEFAULT_TOP_LIMIT,
    };

    let StoreConfig::Enabled(appwrite) = Config::from_env().store else {
        anyhow::bail!("Appwrite configuration is incomplete");
    };
    let counters = SearchCounters::new(Arc::new(AppwriteClient::new(appwrite)?));

    for counter in counters.top_searches(limit).await {
        println!("{}", serde_json::to_string_pretty(&counter)?);
    }

    Ok(())
}
