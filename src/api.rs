use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::cache::FeedCache;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::ingest::{self, fetch, types::CanonicalRecord};

#[derive(Clone)]
pub struct AppState {
    feeds: Arc<HashMap<String, FeedConfig>>,
    cache: Arc<FeedCache>,
    client: reqwest::Client,
}

impl AppState {
    pub fn new(feeds: HashMap<String, FeedConfig>) -> Self {
        Self {
            feeds: Arc::new(feeds),
            cache: Arc::new(FeedCache::new()),
            client: fetch::build_client(),
        }
    }

    /// Same state with a caller-provided cache (tests inject a mock clock).
    pub fn with_cache(feeds: HashMap<String, FeedConfig>, cache: FeedCache) -> Self {
        Self {
            feeds: Arc::new(feeds),
            cache: Arc::new(cache),
            client: fetch::build_client(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/{feed}", get(feed_items))
        .route("/api/{feed}/update-cache", get(update_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Response shape shared by success and failure: the frontend always gets an
/// `items` array it can render, plus an `error` string when something broke.
#[derive(serde::Serialize)]
pub struct FeedResponse {
    pub items: Vec<CanonicalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn feed_items(
    State(state): State<AppState>,
    Path(feed): Path<String>,
) -> (StatusCode, Json<FeedResponse>) {
    serve_feed(&state, &feed, false).await
}

/// Operator-facing refresh: bypasses the TTL unconditionally so a broken
/// upstream can be retried without waiting out stale cache.
async fn update_cache(
    State(state): State<AppState>,
    Path(feed): Path<String>,
) -> (StatusCode, Json<FeedResponse>) {
    serve_feed(&state, &feed, true).await
}

async fn serve_feed(state: &AppState, name: &str, force: bool) -> (StatusCode, Json<FeedResponse>) {
    let Some(cfg) = state.feeds.get(name) else {
        return error_response(FeedError::UnknownFeed(name.to_string()));
    };

    let ttl = cfg.cache_ttl_secs.map(Duration::from_secs);

    if !force {
        if let Some(ttl) = ttl {
            if let Some(items) = state.cache.get(&cfg.name, ttl) {
                metrics::counter!("feed_cache_hits_total").increment(1);
                return ok_response(items);
            }
            metrics::counter!("feed_cache_misses_total").increment(1);
        }
    } else {
        state.cache.invalidate(&cfg.name);
    }

    match ingest::run_feed(&state.client, cfg).await {
        Ok(items) => {
            if ttl.is_some() {
                state.cache.set(&cfg.name, items.clone());
            }
            ok_response(items)
        }
        Err(e) => error_response(e),
    }
}

fn ok_response(items: Vec<CanonicalRecord>) -> (StatusCode, Json<FeedResponse>) {
    (StatusCode::OK, Json(FeedResponse { items, error: None }))
}

fn error_response(e: FeedError) -> (StatusCode, Json<FeedResponse>) {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        Json(FeedResponse {
            items: Vec::new(),
            error: Some(e.to_string()),
        }),
    )
}
