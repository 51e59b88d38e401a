// src/ingest/normalize.rs
//! Per-source adapters into [`CanonicalRecord`].
//!
//! Both adapters are total: missing fields default to empty strings or
//! `None`, and a date that fails to parse yields `date: None` (the window
//! filter drops it later). Nothing here returns an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::image::{image_from_html, make_absolute};
use crate::ingest::parse::RssItem;
use crate::ingest::types::CanonicalRecord;

/// Field-name candidates tried in order on OpenData-style JSON records.
const TITLE_KEYS: &[&str] = &["title", "titre", "nom"];
const DATE_KEYS: &[&str] = &["date_start", "date_debut", "date", "pubDate"];
const DESC_KEYS: &[&str] = &["description", "descriptif", "resume"];
const LINK_KEYS: &[&str] = &["link", "url", "permalink"];
const IMAGE_KEYS: &[&str] = &["image", "image_url", "thumbnail", "photo"];
const LOCATION_KEYS: &[&str] = &["location", "lieu", "commune", "adresse"];

/// Map one RSS item to the canonical shape. `image` comes from the image
/// resolver so the priority logic stays in one place.
pub fn record_from_rss_item(
    source: &str,
    index: usize,
    item: &RssItem,
    image: Option<String>,
) -> CanonicalRecord {
    let id = item
        .guid
        .as_ref()
        .and_then(|g| g.value.clone())
        .filter(|v| !v.trim().is_empty())
        .or_else(|| item.link.clone().filter(|l| !l.trim().is_empty()))
        .unwrap_or_else(|| format!("{source}-{index}"));

    let description = item
        .content_encoded
        .clone()
        .filter(|c| !c.is_empty())
        .or_else(|| item.description.clone())
        .unwrap_or_default();

    CanonicalRecord {
        id,
        title: item.title.clone().unwrap_or_default().trim().to_string(),
        date: item.pub_date.as_deref().and_then(parse_date_permissive),
        description,
        link: item.link.clone(),
        image,
        location: None,
    }
}

/// Map one OpenData-style JSON record to the canonical shape. Field names
/// vary per dataset, so each canonical field tries a candidate list in order.
pub fn record_from_opendata(
    source: &str,
    index: usize,
    record: &serde_json::Value,
    feed_url: &str,
) -> CanonicalRecord {
    // Some portals nest the payload under "fields" or "record".
    let fields = record
        .get("fields")
        .or_else(|| record.get("record"))
        .unwrap_or(record);

    // recordid lives at the top level on OpenDataSoft-style payloads.
    let id = first_string(record, &["id", "recordid", "uid"])
        .or_else(|| first_string(fields, &["id", "recordid", "uid"]))
        .or_else(|| first_string(fields, LINK_KEYS))
        .unwrap_or_else(|| format!("{source}-{index}"));

    let link = first_string(fields, LINK_KEYS);
    let description = first_string(fields, DESC_KEYS).unwrap_or_default();

    let image = first_string(fields, IMAGE_KEYS)
        .or_else(|| image_from_html(&description))
        .map(|u| make_absolute(&u, link.as_deref(), feed_url));

    CanonicalRecord {
        id,
        title: first_string(fields, TITLE_KEYS)
            .unwrap_or_default()
            .trim()
            .to_string(),
        date: first_string(fields, DATE_KEYS)
            .as_deref()
            .and_then(parse_date_permissive),
        description,
        link,
        image,
        location: first_string(fields, LOCATION_KEYS),
    }
}

fn first_string(value: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .filter_map(|v| v.as_str())
        .map(|s| s.to_string())
        .find(|s| !s.trim().is_empty())
}

/// Try the date formats seen across our sources, first hit wins:
/// RFC 2822 (RSS pubDate), RFC 3339, then the two OpenData spellings.
pub fn parse_date_permissive(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return DateTime::from_timestamp(dt.to_offset(UtcOffset::UTC).unix_timestamp(), 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    None
}
