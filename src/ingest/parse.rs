// src/ingest/parse.rs
//! RSS 2.0 parsing via quick-xml's serde support, with optional Media RSS
//! extension fields.
//!
//! Two real-world quirks are handled here rather than per caller:
//! - `channel.item` must always come back as a list, whether the feed has
//!   0, 1, or N entries (`#[serde(default)]` + Vec accumulation).
//! - feeds embed bare HTML entities (`&nbsp;` and friends) outside CDATA,
//!   which is invalid XML; they are scrubbed before parsing.

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FeedError;

#[derive(Debug, Deserialize)]
pub struct Rss {
    pub channel: Channel,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    pub title: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "item", default)]
    pub items: Vec<RssItem>,
}

/// One `<item>` as it appears on the wire. Untrusted input: every field is
/// optional and attribute access is explicit.
#[derive(Debug, Default, Deserialize)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub description: Option<String>,
    // quick-xml's serde deserializer strips namespace prefixes, so matching
    // is on the local name: `content:encoded` arrives as `encoded`,
    // `media:content` as `content`, `media:thumbnail` as `thumbnail`.
    #[serde(rename = "encoded")]
    pub content_encoded: Option<String>,
    pub enclosure: Option<Enclosure>,
    #[serde(rename = "content", default)]
    pub media_content: Vec<MediaRef>,
    #[serde(rename = "thumbnail", default)]
    pub media_thumbnail: Vec<MediaRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Guid {
    #[serde(rename = "$text")]
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Enclosure {
    #[serde(rename = "@url")]
    pub url: Option<String>,
    #[serde(rename = "@type")]
    pub mime: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaRef {
    #[serde(rename = "@url")]
    pub url: Option<String>,
}

/// Parse decoded feed text into items. An HTML block page (or any other
/// non-XML body) surfaces as `FeedError::Parse`, never as an empty success,
/// so callers can tell "no events" from "feed broken".
pub fn parse_rss(text: &str) -> Result<Vec<RssItem>, FeedError> {
    let clean = scrub_html_entities_for_xml(text);
    let rss: Rss =
        from_str(&clean).map_err(|e| FeedError::Parse(format!("rss xml: {e}")))?;
    Ok(rss.channel.items)
}

/// Replace HTML-only entities that are invalid in XML outside CDATA.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&eacute;", "\u{e9}")
        .replace("&egrave;", "\u{e8}")
        .replace("&agrave;", "\u{e0}")
}
