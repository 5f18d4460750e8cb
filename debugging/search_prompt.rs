//! Interactive search against TMDB with the same 500ms debounce the browser uses.
//! Each line typed on stdin replaces the pending search term; an empty line lists
//! popular movies.
//! Usage:
//!   cargo run --bin search_prompt
//! Requires TMDB_API_KEY or TMDB_PROXY_URL in the environment (.env supported).
//! Appwrite variables are optional; when present, searches are counted.

use anyhow::Result;
use dotenvy::dotenv;
use reelfinder::app::AppState;
use reelfinder::config::Config;
use reelfinder::debounce::{debounce, SEARCH_DEBOUNCE};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present for local runs.
    dotenv().ok();
    tracing_subscriber::fmt().with_target(false).compact().init();

    let config = Config::from_env();
    let discovery = AppState::from_config(&config)?.discovery;

    let (tx, rx) = mpsc::channel(16);
    let mut terms = debounce(rx, SEARCH_DEBOUNCE);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    while let Some(term) = terms.recv().await {
        match discovery.fetch_movies(&term).await {
            Ok(movies) => {
                println!("{} result(s) for '{}'", movies.len(), term.trim());
                for movie in movies.iter().take(10) {
                    let year = movie
                        .release_date
                        .as_deref()
                        .and_then(|d| d.split('-').next())
                        .filter(|y| !y.is_empty())
                        .unwrap_or("N/A");
                    let rating = movie
                        .vote_average
                        .map(|r| format!("{r:.1}"))
                        .unwrap_or_else(|| "N/A".to_string());
                    println!("  [{}] {} ({}) {}", movie.id, movie.title, year, rating);
                }
            }
            Err(message) => println!("{}", message),
        }
    }

    Ok(())
}
