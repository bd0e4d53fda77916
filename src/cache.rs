//! TTL-bounded cache of completion results.
//!
//! Keyed by a fingerprint of the request (command plus the line prefix up
//! to the token being completed). Entries expire after a fixed TTL and can
//! be cleared explicitly. Used by the long-lived host to short-circuit
//! repeated walks; the short-lived completer binary doesn't live long
//! enough to profit from it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::catalog::Candidate;

/// Default time-to-live for a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    results: Vec<Candidate>,
    hits: u64,
    stored_at: Instant,
}

/// Thread-safe completion cache with per-entry expiry.
pub struct CompletionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl CompletionCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fingerprint for a request: the command plus the line prefix.
    pub fn fingerprint(command: &str, line_prefix: &str) -> String {
        format!("{}\u{1f}{}", command.to_ascii_lowercase(), line_prefix)
    }

    /// Fetch a live entry, bumping its hit count.
    pub fn get(&self, key: &str) -> Option<Vec<Candidate>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get_mut(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                entry.hits += 1;
                Some(entry.results.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store results for a fingerprint, replacing any previous entry.
    pub fn put(&self, key: String, results: Vec<Candidate>) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key,
            CacheEntry {
                results,
                hits: 0,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    /// Drop expired entries, returning how many were evicted.
    pub fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Live entry count.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
