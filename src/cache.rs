// src/cache.rs
//! Process-wide TTL cache in front of the feed pipeline.
//!
//! Best-effort warmth only: the runtime may recycle the process or run
//! several isolated instances, so callers must tolerate a miss on every
//! request. The clock is injected so tests control expiry without sleeping.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::ingest::types::CanonicalRecord;

/// Time source for the cache. Production uses [`SystemClock`].
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0))
            .as_secs()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Vec<CanonicalRecord>,
    fetched_at: u64,
}

/// One entry per feed name, guarded by a single mutex. The pipeline behind
/// it is idempotent, so concurrent cold-cache requests doing redundant
/// fetches is an accepted inefficiency, not a bug.
pub struct FeedCache {
    inner: Mutex<HashMap<String, CacheEntry>>,
    clock: Box<dyn Clock>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Cached records for `key` if the entry is younger than `ttl`.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Vec<CanonicalRecord>> {
        let now = self.clock.now_unix();
        let map = self.inner.lock().expect("feed cache mutex poisoned");
        map.get(key).and_then(|entry| {
            if now.saturating_sub(entry.fetched_at) < ttl.as_secs() {
                Some(entry.records.clone())
            } else {
                None
            }
        })
    }

    /// Store fresh records, stamping them with the current clock.
    pub fn set(&self, key: &str, records: Vec<CanonicalRecord>) {
        let now = self.clock.now_unix();
        let mut map = self.inner.lock().expect("feed cache mutex poisoned");
        map.insert(
            key.to_string(),
            CacheEntry {
                records,
                fetched_at: now,
            },
        );
    }

    /// Drop an entry so the next read re-runs the pipeline. The force-refresh
    /// endpoint uses this before refetching.
    pub fn invalidate(&self, key: &str) {
        let mut map = self.inner.lock().expect("feed cache mutex poisoned");
        map.remove(key);
    }

    /// Age of an entry in seconds, for diagnostics.
    pub fn age_secs(&self, key: &str) -> Option<u64> {
        let now = self.clock.now_unix();
        let map = self.inner.lock().expect("feed cache mutex poisoned");
        map.get(key).map(|e| now.saturating_sub(e.fetched_at))
    }
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::new()
    }
}
