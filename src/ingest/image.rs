// src/ingest/image.rs
//! Best-effort cover image extraction.
//!
//! Feeds put their cover image in wildly different places; this module owns
//! the single priority list so callers never re-implement the guessing:
//!   1. `<enclosure url=...>` (when its type is an image, or untyped)
//!   2. `media:content` / `media:thumbnail`
//!   3. an `<img>` tag inside the description/content HTML
//!      (`srcset` > `src` > `data-src` > `data-lazy`)
//!   4. any bare URL in the text with an image extension
//!
//! The regex scan is a heuristic, isolated here so it can be swapped for a
//! real HTML parser without touching callers. Nothing in this module panics
//! or returns an error; the answer is a URL or `None`.

use once_cell::sync::OnceCell;
use regex::Regex;
use url::Url;

use crate::ingest::parse::RssItem;

/// Resolve the cover image for one RSS item. Relative URLs are made absolute
/// against the item's own link first, then the feed URL.
pub fn resolve_image(item: &RssItem, feed_url: &str) -> Option<String> {
    let found = raw_image_candidate(item)?;
    Some(make_absolute(&found, item.link.as_deref(), feed_url))
}

fn raw_image_candidate(item: &RssItem) -> Option<String> {
    if let Some(enc) = &item.enclosure {
        let is_image = enc
            .mime
            .as_deref()
            .map(|m| m.starts_with("image"))
            .unwrap_or(true);
        if is_image {
            if let Some(u) = enc.url.as_deref().filter(|u| !u.is_empty()) {
                return Some(u.to_string());
            }
        }
    }

    for media in item.media_content.iter().chain(item.media_thumbnail.iter()) {
        if let Some(u) = media.url.as_deref().filter(|u| !u.is_empty()) {
            return Some(u.to_string());
        }
    }

    let html = match (&item.content_encoded, &item.description) {
        (Some(c), _) if !c.is_empty() => c.as_str(),
        (_, Some(d)) => d.as_str(),
        _ => return None,
    };
    image_from_html(html)
}

/// Scan a blob of (possibly escaped, possibly CDATA-wrapped) HTML for an
/// image URL. Public so the OpenData adapter can reuse it on description
/// fields.
pub fn image_from_html(raw: &str) -> Option<String> {
    let html = unescape_html(raw);

    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    let re_img = RE_IMG.get_or_init(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());

    for tag in re_img.find_iter(&html) {
        // srcset first: lazy-loading themes leave src pointing at a spacer gif.
        if let Some(srcset) = attr_value(tag.as_str(), "srcset") {
            if let Some(first) = first_srcset_candidate(&srcset) {
                return Some(first);
            }
        }
        for attr in ["src", "data-src", "data-lazy"] {
            if let Some(v) = attr_value(tag.as_str(), attr) {
                if !v.is_empty() {
                    return Some(v);
                }
            }
        }
    }

    bare_image_url(&html)
}

/// Strip CDATA wrappers and decode HTML entities so attribute regexes see
/// real quotes and angle brackets.
fn unescape_html(raw: &str) -> String {
    let stripped = raw.replace("<![CDATA[", "").replace("]]>", "");
    html_escape::decode_html_entities(&stripped).into_owned()
}

fn attr_value(tag: &str, attr: &str) -> Option<String> {
    static CACHE: OnceCell<Vec<(&'static str, Regex)>> = OnceCell::new();
    let cache = CACHE.get_or_init(|| {
        ["srcset", "src", "data-src", "data-lazy"]
            .into_iter()
            .map(|a| {
                let re = Regex::new(&format!(r#"(?i)\b{a}\s*=\s*["']([^"']+)["']"#)).unwrap();
                (a, re)
            })
            .collect()
    });
    let re = &cache.iter().find(|(a, _)| *a == attr)?.1;
    re.captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// First URL of a srcset, without its width/density descriptor.
fn first_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()?
        .split_whitespace()
        .next()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

/// Last resort: any URL in the text that ends with a known image extension.
fn bare_image_url(text: &str) -> Option<String> {
    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re = RE_URL.get_or_init(|| {
        Regex::new(r#"(?i)https?://[^\s"'<>()]+\.(?:jpe?g|png|gif|webp|avif)(?:\?[^\s"'<>()]*)?"#)
            .unwrap()
    });
    re.find(text).map(|m| m.as_str().to_string())
}

/// Resolve a possibly-relative URL against the item link, then the feed URL.
/// A malformed base (or candidate) returns the candidate unchanged rather
/// than failing.
pub fn make_absolute(candidate: &str, item_link: Option<&str>, feed_url: &str) -> String {
    if Url::parse(candidate).is_ok() {
        return candidate.to_string();
    }
    for base in item_link.into_iter().chain(std::iter::once(feed_url)) {
        if let Ok(base_url) = Url::parse(base) {
            if let Ok(joined) = base_url.join(candidate) {
                return joined.to_string();
            }
        }
    }
    candidate.to_string()
}
