// tests/pipeline_e2e.rs
//
// Full pipeline over fixture bytes (no network): parse -> normalize ->
// dedup across sources -> window filter -> sort.

use chrono::{Duration, Utc};
use regional_agenda::config::{FeedConfig, SourceConfig, SourceKind};
use regional_agenda::error::FeedError;
use regional_agenda::ingest::{assemble_feed, dedup_records, filter_and_sort, records_from_bytes};

fn rss_source(name: &str) -> SourceConfig {
    SourceConfig {
        name: name.into(),
        url: format!("https://{name}.example/events.rss"),
        kind: SourceKind::Rss,
    }
}

fn agenda_feed() -> FeedConfig {
    FeedConfig {
        name: "agenda".into(),
        window_days: Some(31),
        future_only: true,
        cache_ttl_secs: Some(900),
        sources: vec![rss_source("openagenda"), rss_source("mairie")],
    }
}

#[test]
fn duplicate_event_across_sources_collapses_and_window_applies() {
    let now = Utc::now();
    let in5 = (now + Duration::days(5)).to_rfc2822();
    let in40 = (now + Duration::days(40)).to_rfc2822();

    let feed_a = format!(
        r#"<rss version="2.0"><channel>
            <item>
              <title>Concert A</title>
              <pubDate>{in5}</pubDate>
              <description>&lt;img src="https://x/a.jpg"&gt;</description>
            </item>
            <item>
              <title>Trop loin</title>
              <pubDate>{in40}</pubDate>
            </item>
        </channel></rss>"#
    );
    let feed_b = format!(
        r#"<rss version="2.0"><channel>
            <item>
              <title>Concert A</title>
              <pubDate>{in5}</pubDate>
              <description>Autre source, sans image.</description>
            </item>
        </channel></rss>"#
    );

    let feed = agenda_feed();
    let mut records = records_from_bytes(&feed.sources[0], feed_a.as_bytes()).unwrap();
    records.extend(records_from_bytes(&feed.sources[1], feed_b.as_bytes()).unwrap());
    assert_eq!(records.len(), 3);

    let (deduped, dedup_dropped) = dedup_records(records);
    assert_eq!(dedup_dropped, 1, "same title + same day collapses");

    let (kept, window_dropped) = filter_and_sort(deduped, now, &feed);
    assert_eq!(window_dropped, 1, "the +40d item falls outside the window");

    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "Concert A");
    assert_eq!(
        kept[0].image.as_deref(),
        Some("https://x/a.jpg"),
        "first-seen record (the one with the image) wins"
    );
}

#[test]
fn pipeline_is_idempotent_over_identical_bytes() {
    let now = Utc::now();
    let in3 = (now + Duration::days(3)).to_rfc2822();
    let xml = format!(
        r#"<rss version="2.0"><channel>
            <item><title>Atelier</title><link>https://x/e/1</link><pubDate>{in3}</pubDate></item>
        </channel></rss>"#
    );

    let feed = agenda_feed();
    let run = |bytes: &[u8]| {
        let records = records_from_bytes(&feed.sources[0], bytes).unwrap();
        let (deduped, _) = dedup_records(records);
        filter_and_sort(deduped, now, &feed).0
    };

    assert_eq!(run(xml.as_bytes()), run(xml.as_bytes()));
}

#[test]
fn one_failing_source_still_serves_the_other() {
    let now = Utc::now();
    let in4 = (now + Duration::days(4)).to_rfc2822();
    let good = format!(
        r#"<rss version="2.0"><channel>
            <item><title>Vide-grenier</title><pubDate>{in4}</pubDate></item>
        </channel></rss>"#
    );

    let feed = agenda_feed();
    let fetched = vec![
        Err(FeedError::Upstream { status: 403 }),
        Ok(good.into_bytes()),
    ];

    let kept = assemble_feed(&feed, now, fetched).expect("healthy source should carry the feed");
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "Vide-grenier");
}

#[test]
fn all_sources_failing_returns_the_first_error() {
    let feed = agenda_feed();
    let fetched: Vec<Result<Vec<u8>, FeedError>> = vec![
        Err(FeedError::Upstream { status: 403 }),
        Err(FeedError::Network("connection refused".into())),
    ];

    match assemble_feed(&feed, Utc::now(), fetched) {
        Err(FeedError::Upstream { status: 403 }) => {}
        other => panic!("expected the first source's error, got {other:?}"),
    }
}

#[test]
fn broken_body_on_one_source_counts_as_that_source_failing() {
    // Fetch succeeded but the body is an HTML block page: same tolerance
    // rules as a fetch failure.
    let now = Utc::now();
    let in4 = (now + Duration::days(4)).to_rfc2822();
    let good = format!(
        r#"<rss version="2.0"><channel>
            <item><title>Loto</title><pubDate>{in4}</pubDate></item>
        </channel></rss>"#
    );

    let feed = agenda_feed();
    let fetched = vec![
        Ok(b"<!DOCTYPE html><html><body>blocked</body></html>".to_vec()),
        Ok(good.into_bytes()),
    ];

    let kept = assemble_feed(&feed, now, fetched).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "Loto");
}

#[test]
fn opendata_fixture_normalizes_with_field_candidates() {
    let source = SourceConfig {
        name: "infolocale".into(),
        url: "https://data.infolocale.example/api/records?dataset=agenda".into(),
        kind: SourceKind::OpenData,
    };
    let records =
        records_from_bytes(&source, include_bytes!("fixtures/opendata_events.json")).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].id, "rec-1");
    assert_eq!(records[0].title, "Fête de la musique");
    assert_eq!(records[0].location.as_deref(), Some("Centre-bourg"));
    assert_eq!(
        records[0].image.as_deref(),
        Some("https://ville.example/img/fete.jpg"),
        "relative image resolves against the record's own url"
    );

    // date_start outranks date_debut
    assert_eq!(
        records[1].date.unwrap().to_rfc3339(),
        "2025-06-25T18:00:00+00:00"
    );
}
