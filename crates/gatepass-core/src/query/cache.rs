//! Explicit query cache keyed by [`QueryKey`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Identifier grouping cached results for one read query, e.g. `["stats"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// True when `prefix` matches the leading segments of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<&str> for QueryKey {
    fn from(part: &str) -> Self {
        Self(vec![part.to_string()])
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(parts: [&str; N]) -> Self {
        Self::new(parts)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{part}\"")?;
        }
        write!(f, "]")
    }
}

/// A cached response body (the envelope's `data`).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub updated_at: DateTime<Utc>,
    /// Set by [`QueryCache::invalidate`]; the value is kept for display until
    /// the next successful fetch replaces it.
    pub stale: bool,
}

/// Last successful result per key, shared by every query and mutation of a
/// [`QueryClient`](super::QueryClient).
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are replaced whole, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    /// Replaces the entry for `key`. Whoever calls last wins.
    pub fn set(&self, key: QueryKey, value: Value) {
        tracing::trace!(%key, "cache set");
        self.lock().insert(
            key,
            CacheEntry {
                value,
                updated_at: Utc::now(),
                stale: false,
            },
        );
    }

    /// Marks `key` stale. Returns whether an entry existed.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.lock().get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Marks every key under `prefix` stale. Returns how many were touched.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.lock();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                count += 1;
            }
        }
        count
    }

    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
