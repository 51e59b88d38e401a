// src/ingest/types.rs
use chrono::{DateTime, Utc};

/// Normalized representation of one event or podcast episode, independent of
/// the source format. Constructed once per pipeline run, never mutated.
///
/// `date` is `None` when the source date failed to parse; such records are
/// dropped by the window filter, so anything served over HTTP carries a valid
/// RFC 3339 instant.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct CanonicalRecord {
    pub id: String,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    /// May contain raw HTML; the frontend decides how to render it.
    pub description: String,
    pub link: Option<String>,
    /// Absolute URL or `None`, never a relative path.
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CanonicalRecord {
    /// Key used by the deduplicator: lowercased trimmed title plus the
    /// calendar day. Heuristic on purpose; see DESIGN.md.
    pub fn dedup_key(&self) -> String {
        let day = self
            .date
            .map(|d| d.date_naive().to_string())
            .unwrap_or_default();
        format!("{}-{}", self.title.to_lowercase().trim(), day)
    }
}
