// src/ingest/fetch.rs
//! Outbound HTTP for third-party feeds.
//!
//! Several providers answer default server-side user agents with a 403 or an
//! HTML interstitial instead of the feed, so every request goes out with
//! browser-like headers. One GET per call, no retry, no response caching.

use std::time::Duration;

use reqwest::header::{ACCEPT, REFERER, USER_AGENT};
use url::Url;

use crate::error::FeedError;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";
const ACCEPT_FEED: &str = "application/rss+xml, application/xml;q=0.9, */*;q=0.8";
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Client shared across requests. The timeout keeps an accidental fetch from
/// a build/compile context from hanging until the platform kills us.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Fetch raw feed bytes. Non-2xx becomes `FeedError::Upstream` with the
/// original status; DNS/connect/timeout failures become `FeedError::Network`.
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FeedError> {
    let resp = client
        .get(url)
        .header(USER_AGENT, BROWSER_UA)
        .header(ACCEPT, ACCEPT_FEED)
        .header(REFERER, origin_of(url))
        .send()
        .await
        .map_err(classify_send_error)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::Upstream {
            status: status.as_u16(),
        });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FeedError::Network(format!("reading feed body: {e}")))?;
    Ok(bytes.to_vec())
}

fn classify_send_error(e: reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Network(format!("feed request timed out: {e}"))
    } else if e.is_connect() {
        FeedError::Network(format!("could not connect to feed host: {e}"))
    } else {
        FeedError::Network(e.to_string())
    }
}

/// Referer sent with the request: the feed's own origin.
fn origin_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => match u.host_str() {
            Some(host) => format!("{}://{}/", u.scheme(), host),
            None => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}
