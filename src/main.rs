//! Regional Agenda Feed Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the feed registry, cache, and metrics.
//!
//! See `README.md` for quickstart.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use regional_agenda::{api, config, metrics::Metrics};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - AGENDA_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("AGENDA_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("regional_agenda=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // Feed registry: env override, config/ files, then built-ins. A broken
    // config file falls back to the built-ins rather than refusing to boot.
    let feeds = config::load_feeds_default().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "feeds config failed to load, using built-ins");
        config::builtin_feeds()
    });

    if let Some(base) = config::public_base_url() {
        tracing::info!(base_url = %base, "public base url configured");
    }

    let agenda_ttl = feeds
        .iter()
        .find(|f| f.name == "agenda")
        .and_then(|f| f.cache_ttl_secs)
        .unwrap_or(900);
    let metrics = Metrics::init(agenda_ttl);

    let state = api::AppState::new(config::feeds_by_name(feeds));
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
