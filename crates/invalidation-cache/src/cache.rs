//! LRU query cache keyed by hierarchical query keys

use crate::config::CacheConfig;
use crate::refetch::Refetcher;
use crate::stats::CacheStats;
use ahash::RandomState;
use invalidation_core::{InvalidationInstruction, QueryKey};
use lru::LruCache;
use parking_lot::RwLock;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Entry stored in the cache
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached query response
    pub value: Value,
    /// When this entry was created
    pub created_at: Instant,
    /// Approximate size in bytes
    pub size_bytes: usize,
    /// Number of times this entry was accessed
    pub hit_count: u64,
    /// Whether an invalidation has marked this entry out of date
    pub stale: bool,
    /// Live consumers currently watching this entry
    pub observers: u32,
}

impl CacheEntry {
    fn new(value: Value) -> Self {
        let size_bytes = estimate_value_size(&value);
        Self {
            value,
            created_at: Instant::now(),
            size_bytes,
            hit_count: 0,
            stale: false,
            observers: 0,
        }
    }

    /// Check if this entry has expired based on TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }

    /// Whether anyone is currently observing this entry
    pub fn is_active(&self) -> bool {
        self.observers > 0
    }

    /// Get the age of this entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Rough in-memory footprint of a JSON payload
fn estimate_value_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) => 8,
        Value::Number(_) => 16,
        Value::String(text) => 24 + text.len(),
        Value::Array(items) => 24 + items.iter().map(estimate_value_size).sum::<usize>(),
        Value::Object(map) => {
            24 + map
                .iter()
                .map(|(key, item)| 24 + key.len() + estimate_value_size(item))
                .sum::<usize>()
        }
    }
}

/// Thread-safe LRU cache for query responses
///
/// Entries are indexed by hierarchical [`QueryKey`]s so invalidation
/// instructions can address them exactly or as a subtree. Invalidation
/// marks entries stale rather than dropping them; stale data stays
/// readable until a refetch replaces it.
pub struct QueryCache {
    /// The underlying LRU cache
    entries: RwLock<LruCache<QueryKey, CacheEntry, RandomState>>,
    /// Cache configuration
    config: CacheConfig,
    /// Cache statistics
    stats: Arc<CacheStats>,
    /// Current memory usage
    memory_used: RwLock<usize>,
}

impl QueryCache {
    /// Create a new query cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::with_hasher(capacity, RandomState::default())),
            config,
            stats: Arc::new(CacheStats::new()),
            memory_used: RwLock::new(0),
        }
    }

    /// Create a cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get a cached response
    ///
    /// Stale entries are still returned; staleness is visible through
    /// [`QueryCache::is_stale`] and it is the caller's choice whether to
    /// serve stale data while a refetch is in flight. TTL-expired entries
    /// are dropped on access.
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }

        let mut cache = self.entries.write();

        let expired = cache
            .peek(key)
            .map(|entry| entry.is_expired(self.config.ttl))
            .unwrap_or(false);
        if expired {
            if let Some(entry) = cache.pop(key) {
                let mut memory_used = self.memory_used.write();
                *memory_used = memory_used.saturating_sub(entry.size_bytes);
                self.stats.record_expiration();
            }
        }

        let result = match cache.get_mut(key) {
            Some(entry) => {
                entry.hit_count += 1;
                Some(entry.value.clone())
            }
            None => None,
        };

        let entry_count = cache.len() as u64;
        drop(cache);

        if result.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        self.stats.set_entry_count(entry_count);
        self.stats.set_memory_bytes(*self.memory_used.read() as u64);

        result
    }

    /// Insert a fresh response
    ///
    /// Replacing an entry clears its stale flag and keeps its observer
    /// count, since the watchers are still watching after a refetch.
    pub fn put(&self, key: QueryKey, value: Value) {
        if !self.config.enabled {
            return;
        }

        let mut entry = CacheEntry::new(value);
        let entry_size = entry.size_bytes;

        // Don't cache responses that are too large to ever fit
        if entry_size > self.config.max_memory_bytes {
            return;
        }

        let mut cache = self.entries.write();
        let mut memory_used = self.memory_used.write();

        if let Some(existing) = cache.peek(&key) {
            entry.observers = existing.observers;
        }

        // Evict entries if we would exceed the memory limit
        while *memory_used + entry_size > self.config.max_memory_bytes && !cache.is_empty() {
            if let Some((_, evicted)) = cache.pop_lru() {
                *memory_used = memory_used.saturating_sub(evicted.size_bytes);
                self.stats.record_eviction();
            }
        }

        if let Some((displaced_key, displaced)) = cache.push(key.clone(), entry) {
            *memory_used = memory_used.saturating_sub(displaced.size_bytes);
            // push returns the old value for an in-place replacement and
            // the LRU entry when capacity forced something else out
            if displaced_key != key {
                self.stats.record_eviction();
            }
        }

        *memory_used += entry_size;

        let entry_count = cache.len() as u64;
        let memory_bytes = *memory_used as u64;
        drop(memory_used);
        drop(cache);

        self.stats.set_entry_count(entry_count);
        self.stats.set_memory_bytes(memory_bytes);
    }

    /// Apply one invalidation instruction
    ///
    /// Every matching entry is marked stale. When the instruction asks
    /// for an active refetch, matching entries with live observers are
    /// handed to `refetcher` after the cache lock is released. Returns
    /// the number of entries the instruction matched.
    pub fn apply(&self, instruction: &InvalidationInstruction, refetcher: &dyn Refetcher) -> usize {
        if !self.config.enabled {
            return 0;
        }

        let mut matched = 0;
        let mut to_refetch = Vec::new();
        {
            let mut cache = self.entries.write();
            for (key, entry) in cache.iter_mut() {
                if !instruction.matches(key) {
                    continue;
                }
                matched += 1;
                if !entry.stale {
                    entry.stale = true;
                    self.stats.record_stale_mark();
                }
                if instruction.wants_active_refetch() && entry.is_active() {
                    to_refetch.push(key.clone());
                }
            }
        }

        // Refetch callbacks may re-enter the cache; run them unlocked
        for key in &to_refetch {
            self.stats.record_refetch();
            refetcher.refetch(key);
        }

        if matched > 0 {
            debug!("invalidated {} entries under {}", matched, instruction.key);
        }
        matched
    }

    /// Apply a whole invalidation plan, in order
    ///
    /// Returns the total number of matched entries across instructions.
    pub fn apply_all(
        &self,
        instructions: &[InvalidationInstruction],
        refetcher: &dyn Refetcher,
    ) -> usize {
        instructions
            .iter()
            .map(|instruction| self.apply(instruction, refetcher))
            .sum()
    }

    /// Register a live consumer of an entry
    ///
    /// Returns false when the key is not cached.
    pub fn observe(&self, key: &QueryKey) -> bool {
        let mut cache = self.entries.write();
        match cache.get_mut(key) {
            Some(entry) => {
                entry.observers += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one observer of an entry
    pub fn release(&self, key: &QueryKey) -> bool {
        let mut cache = self.entries.write();
        match cache.get_mut(key) {
            Some(entry) => {
                entry.observers = entry.observers.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Current observer count for an entry
    pub fn observer_count(&self, key: &QueryKey) -> u32 {
        self.entries
            .read()
            .peek(key)
            .map(|entry| entry.observers)
            .unwrap_or(0)
    }

    /// Whether an entry is cached but marked stale
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.entries.read().peek(key).map(|entry| entry.stale)
    }

    /// Remove an entry outright
    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed;
        let entry_count;
        let memory_bytes;
        {
            let mut cache = self.entries.write();
            let mut memory_used = self.memory_used.write();

            if let Some(entry) = cache.pop(key) {
                *memory_used = memory_used.saturating_sub(entry.size_bytes);
                removed = true;
            } else {
                removed = false;
            }
            entry_count = cache.len() as u64;
            memory_bytes = *memory_used as u64;
        }

        if removed {
            self.stats.set_entry_count(entry_count);
            self.stats.set_memory_bytes(memory_bytes);
        }
        removed
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        {
            let mut cache = self.entries.write();
            let mut memory_used = self.memory_used.write();
            cache.clear();
            *memory_used = 0;
        }
        self.stats.set_entry_count(0);
        self.stats.set_memory_bytes(0);
    }

    /// Drop entries that have exceeded the TTL, returning how many
    pub fn evict_expired(&self) -> usize {
        let mut cache = self.entries.write();
        let mut memory_used = self.memory_used.write();
        let ttl = self.config.ttl;

        let expired_keys: Vec<QueryKey> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            if let Some(entry) = cache.pop(&key) {
                *memory_used = memory_used.saturating_sub(entry.size_bytes);
                self.stats.record_expiration();
            }
        }

        self.stats.set_entry_count(cache.len() as u64);
        self.stats.set_memory_bytes(*memory_used as u64);
        count
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get current memory usage in bytes
    pub fn memory_used(&self) -> usize {
        *self.memory_used.read()
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("enabled", &self.config.enabled)
            .field("max_entries", &self.config.max_entries)
            .field("max_memory_bytes", &self.config.max_memory_bytes)
            .field("ttl", &self.config.ttl)
            .field("current_entries", &self.len())
            .field("memory_used", &self.memory_used())
            .finish()
    }
}
