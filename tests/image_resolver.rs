// tests/image_resolver.rs
//
// Image priority and URL resolution over the fixture feed: enclosure beats
// description, media:thumbnail is used when present, lazy-loading attributes
// inside escaped HTML are found, and relative paths resolve against the
// item link.

use regional_agenda::ingest::image::resolve_image;
use regional_agenda::ingest::parse::parse_rss;

const FULL_FEED: &str = include_str!("fixtures/agenda_rss.xml");
const FEED_URL: &str = "https://openagenda.example/agendas/pays-vallee/events.rss";

#[test]
fn fixture_feed_resolves_expected_images() {
    let items = parse_rss(FULL_FEED).unwrap();

    // Item 0 has both an enclosure and an <img> in its description.
    assert_eq!(
        resolve_image(&items[0], FEED_URL).as_deref(),
        Some("https://img.example/halles.jpg"),
        "enclosure must win over the description image"
    );

    assert_eq!(
        resolve_image(&items[1], FEED_URL).as_deref(),
        Some("https://img.example/balade.png")
    );

    // Escaped HTML with a lazy-loading attribute and a relative path.
    assert_eq!(
        resolve_image(&items[2], FEED_URL).as_deref(),
        Some("https://openagenda.example/photos/marche.webp")
    );

    assert_eq!(resolve_image(&items[3], FEED_URL), None);
}
