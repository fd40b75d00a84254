//! Search result caching
//!
//! Searches themselves run on the remote service; this module only keeps
//! recent result pages keyed by a normalized query so retyping the same query
//! does not hit the network again.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::cache::TtlCache;
use crate::models::Snippet;

/// Normalize a search query for cache lookups.
///
/// Trims, lowercases and collapses runs of whitespace into a single space.
///
/// # Examples
///
/// ```
/// use snippetly_core::search::normalize_query;
///
/// assert_eq!(normalize_query("  Async   RUST\t"), "async rust");
/// ```
pub fn normalize_query(query: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"));
    whitespace
        .replace_all(query.trim(), " ")
        .to_lowercase()
}

/// Recent search results, keyed by normalized query
#[derive(Debug)]
pub struct SearchCache {
    results: TtlCache<String, Vec<Snippet>>,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            results: TtlCache::new(ttl),
        }
    }

    /// Cached results for `query`; blank queries are never cached
    pub fn get(&self, query: &str) -> Option<Vec<Snippet>> {
        let key = normalize_query(query);
        if key.is_empty() {
            return None;
        }
        self.results.get(&key)
    }

    pub fn set(&self, query: &str, results: Vec<Snippet>) {
        let key = normalize_query(query);
        if key.is_empty() {
            return;
        }
        self.results.set(key, results);
    }

    /// Forget everything, e.g. after a local write changed the result set
    pub fn clear(&self) {
        self.results.clear();
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(crate::cache::DEFAULT_TTL)
    }
}
