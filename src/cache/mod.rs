//! Time-boxed cache for project-scoped collections
//!
//! Entries are keyed by a typed [`CacheKey`] (`resource kind + project id`)
//! and stay valid for a single TTL measured from insertion. Expired entries
//! are never served: a read past the window drops the entry and reports a
//! miss.
//!
//! Values are shared through `Arc`, so a hit returns the very allocation
//! that was inserted.
//!
//! ```ignore
//! let cache = ProjectCache::new(Duration::from_secs(300));
//! let key = CacheKey::new(ResourceKind::Documents, 7);
//! cache.put(key, CachedValue::Documents(Arc::new(docs)));
//! if let Some((value, inserted_at)) = cache.get(&key) { /* fresh */ }
//! cache.invalidate(&key);
//! ```

use crate::types::{Document, ProjectId, TestSuite, TraceabilityMatrix};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// ============================================================================
// Keys & values
// ============================================================================

/// Cacheable project collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Documents,
    TestSuites,
    Traceability,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Documents,
        ResourceKind::TestSuites,
        ResourceKind::Traceability,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Documents => "documents",
            ResourceKind::TestSuites => "test_suites",
            ResourceKind::Traceability => "traceability",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub project_id: ProjectId,
}

impl CacheKey {
    pub fn new(kind: ResourceKind, project_id: ProjectId) -> Self {
        Self { kind, project_id }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.project_id)
    }
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    Documents(Arc<Vec<Document>>),
    TestSuites(Arc<Vec<TestSuite>>),
    Traceability(Arc<TraceabilityMatrix>),
}

/// Cache used by the project store
pub type ProjectCache = TtlCache<CacheKey, CachedValue>;

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
    pub invalidations: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

// ============================================================================
// TTL cache
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Key/value cache with one expiry window for every entry
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
        entry.inserted_at.elapsed() < self.ttl
    }

    /// Fresh value and its insertion time
    pub fn get(&self, key: &K) -> Option<(V, Instant)> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if self.is_fresh(entry) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some((entry.value.clone(), entry.inserted_at));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Expired: drop it under the write lock, unless it was refreshed meanwhile
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(key) {
            if self.is_fresh(entry) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some((entry.value.clone(), entry.inserted_at));
            }
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace, restarting the window
    pub fn put(&self, key: K, value: V) {
        self.entries.write().insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Age of a fresh entry
    pub fn age(&self, key: &K) -> Option<Duration> {
        self.entries
            .read()
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.inserted_at.elapsed())
    }

    /// Drop one entry; returns whether it existed
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop every entry whose key matches; returns how many were removed
    pub fn invalidate_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        let removed = before - entries.len();
        self.invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.invalidations
            .fetch_add(entries.len() as u64, Ordering::Relaxed);
        entries.clear();
    }

    /// Remove expired entries
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.read().len(),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
