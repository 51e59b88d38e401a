// src/ingest/mod.rs
pub mod encoding;
pub mod fetch;
pub mod image;
pub mod normalize;
pub mod parse;
pub mod types;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

use crate::config::{FeedConfig, SourceConfig, SourceKind};
use crate::error::FeedError;
use crate::ingest::types::CanonicalRecord;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Total records parsed from sources.");
        describe_counter!(
            "feed_kept_total",
            "Records kept after dedup + window filtering."
        );
        describe_counter!("feed_dedup_total", "Records removed as duplicates.");
        describe_counter!(
            "feed_window_dropped_total",
            "Records outside the date window or with no parseable date."
        );
        describe_counter!("feed_source_errors_total", "Source fetch/parse errors.");
        describe_histogram!("feed_parse_ms", "Source decode+parse time in milliseconds.");
        describe_gauge!(
            "feed_pipeline_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
    });
}

/// Collapse records that describe the same logical event: same trimmed
/// lowercase title on the same calendar day. First seen wins, insertion
/// order is preserved. Returns the survivors and the number dropped.
pub fn dedup_records(records: Vec<CanonicalRecord>) -> (Vec<CanonicalRecord>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for rec in records {
        if seen.insert(rec.dedup_key()) {
            keep.push(rec);
        } else {
            dropped += 1;
        }
    }
    (keep, dropped)
}

/// Keep records whose date falls inside the feed's window and sort them
/// ascending. This is the single place where an unparseable upstream date
/// degrades gracefully: `date: None` records are dropped here, silently.
pub fn filter_and_sort(
    records: Vec<CanonicalRecord>,
    now: DateTime<Utc>,
    feed: &FeedConfig,
) -> (Vec<CanonicalRecord>, usize) {
    let upper = feed.window_days.map(|d| now + Duration::days(d));
    let before = records.len();

    let mut keep: Vec<CanonicalRecord> = records
        .into_iter()
        .filter(|r| match r.date {
            None => false,
            Some(d) => {
                let lower_ok = if feed.future_only || feed.window_days.is_some() {
                    d >= now
                } else {
                    true
                };
                let upper_ok = upper.map(|u| d <= u).unwrap_or(true);
                lower_ok && upper_ok
            }
        })
        .collect();

    keep.sort_by_key(|r| r.date);
    let dropped = before - keep.len();
    (keep, dropped)
}

/// Decode, parse, and normalize one source's raw bytes. No network; this is
/// the seam tests drive with fixture bytes.
pub fn records_from_bytes(
    source: &SourceConfig,
    bytes: &[u8],
) -> Result<Vec<CanonicalRecord>, FeedError> {
    let t0 = std::time::Instant::now();
    let text = encoding::decode_bytes(bytes);

    let records = match source.kind {
        SourceKind::Rss => {
            let items = parse::parse_rss(&text)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let img = image::resolve_image(item, &source.url);
                    normalize::record_from_rss_item(&source.name, i, item, img)
                })
                .collect::<Vec<_>>()
        }
        SourceKind::OpenData => {
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| FeedError::Parse(format!("opendata json: {e}")))?;
            let rows = value
                .get("records")
                .or_else(|| value.get("results"))
                .unwrap_or(&value)
                .as_array()
                .cloned()
                .unwrap_or_default();
            rows.iter()
                .enumerate()
                .map(|(i, rec)| normalize::record_from_opendata(&source.name, i, rec, &source.url))
                .collect()
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_items_total").increment(records.len() as u64);
    Ok(records)
}

/// Turn one fetch result per source into the feed's final record list:
/// normalize, dedup across sources, window-filter and sort.
///
/// A failing source in a multi-source feed is logged and counted while the
/// rest are served; the feed itself only fails when every source failed
/// (first error wins). `fetched` is parallel to `feed.sources`.
pub fn assemble_feed(
    feed: &FeedConfig,
    now: DateTime<Utc>,
    fetched: Vec<Result<Vec<u8>, FeedError>>,
) -> Result<Vec<CanonicalRecord>, FeedError> {
    ensure_metrics_described();

    let mut raw: Vec<CanonicalRecord> = Vec::new();
    let mut first_err: Option<FeedError> = None;
    let mut ok_sources = 0usize;

    for (source, result) in feed.sources.iter().zip(fetched) {
        let result = result.and_then(|bytes| records_from_bytes(source, &bytes));
        match result {
            Ok(mut records) => {
                ok_sources += 1;
                raw.append(&mut records);
            }
            Err(e) => {
                tracing::warn!(error = %e, source = %source.name, feed = %feed.name, "source error");
                counter!("feed_source_errors_total").increment(1);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    if ok_sources == 0 {
        if let Some(e) = first_err {
            return Err(e);
        }
    }

    let (deduped, dedup_dropped) = dedup_records(raw);
    let (kept, window_dropped) = filter_and_sort(deduped, now, feed);

    counter!("feed_kept_total").increment(kept.len() as u64);
    counter!("feed_dedup_total").increment(dedup_dropped as u64);
    counter!("feed_window_dropped_total").increment(window_dropped as u64);
    gauge!("feed_pipeline_last_run_ts").set(now.timestamp() as f64);

    tracing::info!(
        feed = %feed.name,
        kept = kept.len(),
        dedup = dedup_dropped,
        window_dropped = window_dropped,
        "feed pipeline run"
    );

    Ok(kept)
}

/// Run the full pipeline for one feed endpoint: fetch every source, then
/// assemble. See [`assemble_feed`] for the partial-failure policy.
pub async fn run_feed(
    client: &reqwest::Client,
    feed: &FeedConfig,
) -> Result<Vec<CanonicalRecord>, FeedError> {
    // Build contexts without egress must not fail; they just see no records.
    if crate::config::offline_build() {
        tracing::info!(feed = %feed.name, "offline build, skipping feed fetch");
        return Ok(Vec::new());
    }

    let mut fetched = Vec::with_capacity(feed.sources.len());
    for source in &feed.sources {
        fetched.push(fetch::fetch_bytes(client, &source.url).await);
    }

    assemble_feed(feed, Utc::now(), fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_feeds;

    fn rec(title: &str, date: Option<&str>) -> CanonicalRecord {
        CanonicalRecord {
            id: title.to_lowercase().replace(' ', "-"),
            title: title.to_string(),
            date: date.and_then(normalize::parse_date_permissive),
            description: String::new(),
            link: None,
            image: None,
            location: None,
        }
    }

    #[test]
    fn dedup_is_case_and_whitespace_insensitive_first_wins() {
        let a = rec("Concert A", Some("2025-07-10"));
        let mut b = rec("  concert a ", Some("2025-07-10T21:00:00+00:00"));
        b.id = "other-id".into();
        let c = rec("Concert A", Some("2025-07-11"));

        let (kept, dropped) = dedup_records(vec![a.clone(), b, c.clone()]);
        assert_eq!(dropped, 1);
        assert_eq!(kept, vec![a, c], "first-seen record wins, other day survives");
    }

    #[test]
    fn window_filter_drops_dateless_and_out_of_range_and_sorts() {
        let feed = FeedConfig {
            name: "agenda".into(),
            window_days: Some(31),
            future_only: true,
            cache_ttl_secs: None,
            sources: builtin_feeds()[0].sources.clone(),
        };
        let now = Utc::now();
        let in5 = (now + Duration::days(5)).to_rfc3339();
        let in2 = (now + Duration::days(2)).to_rfc3339();
        let in40 = (now + Duration::days(40)).to_rfc3339();
        let past = (now - Duration::days(1)).to_rfc3339();

        let records = vec![
            rec("later", Some(&in5)),
            rec("no date", None),
            rec("too far", Some(&in40)),
            rec("sooner", Some(&in2)),
            rec("yesterday", Some(&past)),
        ];
        let (kept, dropped) = filter_and_sort(records, now, &feed);
        assert_eq!(dropped, 3);
        let titles: Vec<_> = kept.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["sooner", "later"], "ascending by date");
    }

    #[test]
    fn unbounded_feed_keeps_past_records_but_not_dateless() {
        let feed = FeedConfig {
            name: "podcasts".into(),
            window_days: None,
            future_only: false,
            cache_ttl_secs: None,
            sources: builtin_feeds()[1].sources.clone(),
        };
        let now = Utc::now();
        let past = (now - Duration::days(100)).to_rfc3339();
        let records = vec![rec("old episode", Some(&past)), rec("broken", None)];
        let (kept, dropped) = filter_and_sort(records, now, &feed);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn records_from_bytes_is_deterministic() {
        let source = SourceConfig {
            name: "openagenda".into(),
            url: "https://openagenda.example/events.rss".into(),
            kind: SourceKind::Rss,
        };
        let xml = br#"<rss version="2.0"><channel>
            <item><title>A</title><link>https://x/a</link>
              <pubDate>Tue, 10 Jun 2025 18:30:00 +0000</pubDate></item>
            <item><title>B</title></item>
        </channel></rss>"#;
        let first = records_from_bytes(&source, xml).unwrap();
        let second = records_from_bytes(&source, xml).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, "https://x/a");
        assert_eq!(first[1].id, "openagenda-1");
    }
}
