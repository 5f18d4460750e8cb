use crate::appwrite::AppwriteClient;
use crate::config::{Config, StoreConfig};
use crate::counters::{SearchCounters, DEFAULT_TOP_LIMIT};
use crate::discovery::{Discovery, NO_TRENDING_MESSAGE};
use crate::proxy::TmdbProxy;
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB safety cap
const MAX_TOP_LIMIT: usize = 50;
const TMDB_PROXY_PREFIX: &str = "/api/tmdb/";

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<TmdbProxy>,
    pub discovery: Discovery,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let proxy = Arc::new(TmdbProxy::new(config.proxy.clone())?);

        let tmdb = TmdbClient::from_config(&config.metadata)?
            .map(|client| Arc::new(client) as Arc<dyn TmdbApi>);

        let counters = match &config.store {
            StoreConfig::Enabled(appwrite) => {
                SearchCounters::new(Arc::new(AppwriteClient::new(appwrite.clone())?))
            }
            StoreConfig::Disabled => SearchCounters::disabled(),
        };

        Ok(Self {
            proxy,
            discovery: Discovery::new(tmdb, counters),
        })
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    config.log_summary();
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tmdb/*path", any(proxy_tmdb))
        .route("/api/movies", get(list_movies))
        .route("/api/movies/:id", get(movie_view))
        .route("/api/trending", get(trending))
        .route("/api/trending/random", get(surprise))
        .route("/api/searches/top", get(top_searches))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn proxy_tmdb(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    // Raw path, not the decoded `Path` extractor, so escapes survive as sent.
    let path = uri.path().strip_prefix(TMDB_PROXY_PREFIX).unwrap_or_default();
    state.proxy.forward(method, path, uri.query(), body).await
}

#[derive(Debug, Deserialize)]
struct MoviesParams {
    #[serde(default)]
    query: String,
}

async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<MoviesParams>,
) -> Response {
    match state.discovery.fetch_movies(&params.query).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(message) => error_json(StatusCode::BAD_GATEWAY, message),
    }
}

async fn movie_view(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.discovery.movie(id).await {
        Ok(view) => Json(view).into_response(),
        Err(message) => error_json(StatusCode::BAD_GATEWAY, message),
    }
}

async fn trending(State(state): State<AppState>) -> Json<serde_json::Value> {
    let results = state.discovery.trending().await;
    Json(json!({ "results": results }))
}

async fn surprise(State(state): State<AppState>) -> Response {
    match state.discovery.surprise().await {
        Some(item) => Json(item).into_response(),
        None => error_json(StatusCode::NOT_FOUND, NO_TRENDING_MESSAGE),
    }
}

#[derive(Debug, Deserialize)]
struct TopParams {
    limit: Option<usize>,
}

async fn top_searches(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Json<serde_json::Value> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TOP_LIMIT)
        .min(MAX_TOP_LIMIT);
    let results = state.discovery.counters().top_searches(limit).await;
    Json(json!({ "results": results }))
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
