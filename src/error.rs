// src/error.rs
use thiserror::Error;

/// Failure taxonomy for one pipeline run.
///
/// `Upstream` and `Network` come out of the fetch stage, `Parse` out of the
/// XML/JSON decode stage. Missing fields inside an otherwise well-formed feed
/// are not errors at all; the normalizer defaults them.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("network error reaching feed: {0}")]
    Network(String),

    #[error("feed body did not parse: {0}")]
    Parse(String),

    #[error("unknown feed '{0}'")]
    UnknownFeed(String),
}

impl FeedError {
    /// HTTP status the API layer should answer with.
    ///
    /// Upstream failures mirror the upstream status so the frontend can show
    /// it; everything network-shaped is a 5xx of our own.
    pub fn http_status(&self) -> u16 {
        match self {
            FeedError::Upstream { status } => *status,
            FeedError::Network(_) => 500,
            FeedError::Parse(_) => 502,
            FeedError::UnknownFeed(_) => 404,
        }
    }
}
