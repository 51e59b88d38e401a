// src/config.rs
//! Feed registry and environment helpers.
//!
//! One [`FeedConfig`] per HTTP endpoint; each endpoint aggregates one or more
//! upstream sources. Loaded from TOML (or JSON) with an env-var override,
//! falling back to the built-in registry when no file is present.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "AGENDA_SOURCES_PATH";
const ENV_OFFLINE: &str = "AGENDA_OFFLINE";

/// Upstream payload shape; selects the per-source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Rss,
    OpenData,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

/// One served feed endpoint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeedConfig {
    pub name: String,
    /// Upper bound of the date window in days from now; `None` = no upper
    /// bound.
    #[serde(default)]
    pub window_days: Option<i64>,
    /// Drop records dated before now. Off for podcast-style feeds where the
    /// archive is the point.
    #[serde(default = "default_true")]
    pub future_only: bool,
    /// `None` means fetch on every request (the no-store endpoints).
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    pub sources: Vec<SourceConfig>,
}

fn default_true() -> bool {
    true
}

#[derive(serde::Deserialize)]
struct FeedsFile {
    feeds: Vec<FeedConfig>,
}

/// Load the registry from an explicit path. Supports TOML or JSON.
pub fn load_feeds_from(path: &Path) -> Result<Vec<FeedConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Load the registry using env var + fallbacks:
/// 1) $AGENDA_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in defaults
pub fn load_feeds_default() -> Result<Vec<FeedConfig>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("AGENDA_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_feeds_from(&json_p);
    }
    Ok(builtin_feeds())
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<Vec<FeedConfig>> {
    if hint_ext == "json" {
        let f: FeedsFile = serde_json::from_str(s).context("parsing feeds json")?;
        return validate(f.feeds);
    }
    let f: FeedsFile = toml::from_str(s).context("parsing feeds toml")?;
    validate(f.feeds)
}

fn validate(feeds: Vec<FeedConfig>) -> Result<Vec<FeedConfig>> {
    let mut seen = std::collections::HashSet::new();
    for f in &feeds {
        if f.name.trim().is_empty() {
            return Err(anyhow!("feed with empty name"));
        }
        if !seen.insert(f.name.clone()) {
            return Err(anyhow!("duplicate feed name '{}'", f.name));
        }
        if f.sources.is_empty() {
            return Err(anyhow!("feed '{}' has no sources", f.name));
        }
    }
    Ok(feeds)
}

/// Registry used when no config file is deployed.
pub fn builtin_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            name: "agenda".into(),
            window_days: Some(31),
            future_only: true,
            cache_ttl_secs: Some(900),
            sources: vec![
                SourceConfig {
                    name: "openagenda".into(),
                    url: "https://openagenda.com/agendas/pays-vallee/events.rss".into(),
                    kind: SourceKind::Rss,
                },
                SourceConfig {
                    name: "infolocale".into(),
                    url: "https://data.infolocale.example/api/records?dataset=agenda".into(),
                    kind: SourceKind::OpenData,
                },
            ],
        },
        FeedConfig {
            name: "podcasts".into(),
            window_days: None,
            future_only: false,
            cache_ttl_secs: None,
            sources: vec![SourceConfig {
                name: "radio-locale".into(),
                url: "https://feeds.acast.com/public/shows/radio-pays-vallee".into(),
                kind: SourceKind::Rss,
            }],
        },
    ]
}

pub fn feeds_by_name(feeds: Vec<FeedConfig>) -> HashMap<String, FeedConfig> {
    feeds.into_iter().map(|f| (f.name.clone(), f)).collect()
}

/// Build/offline guard: when set to "1", the pipeline short-circuits to an
/// empty record list before opening any socket. Static-generation contexts
/// without egress set this instead of letting fetches fail the build.
pub fn offline_build() -> bool {
    std::env::var(ENV_OFFLINE).map(|v| v == "1").unwrap_or(false)
}

/// Public base URL for page-level collaborators building absolute same-origin
/// links. Absence is fine; callers fall back to relative paths.
pub fn public_base_url() -> Option<String> {
    for key in ["PUBLIC_BASE_URL", "DEPLOY_URL"] {
        if let Ok(v) = std::env::var(key) {
            let v = v.trim().to_string();
            if !v.is_empty() {
                if v.starts_with("http://") || v.starts_with("https://") {
                    return Some(v);
                }
                return Some(format!("https://{v}"));
            }
        }
    }
    None
}
