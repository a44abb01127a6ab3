//! Client-side query-result cache with granular invalidation
//!
//! This crate is the consuming side of the invalidation planner: an LRU
//! cache of JSON query responses indexed by hierarchical query keys, able
//! to apply the planner's instructions against its own entries.
//!
//! # Features
//!
//! - **Hierarchical keys**: entries are matched exactly or by key prefix,
//!   so one instruction can sweep a whole subtree
//! - **Stale marking**: invalidated entries stay readable until replaced
//! - **Active refetch**: instructions can trigger eager refetches for
//!   entries that currently have observers
//! - **LRU eviction** with entry and memory limits, plus TTL expiry
//! - **Thread-safe** behind `parking_lot::RwLock`
//! - **Statistics** for hits, misses, stale marks, and refetches
//!
//! # Example
//!
//! ```ignore
//! use invalidation_cache::{NoopRefetcher, QueryCache};
//! use invalidation_planner::plan_invalidations;
//!
//! let cache = QueryCache::with_defaults();
//! let plan = plan_invalidations(executed_sql, project_ref);
//! cache.apply_all(&plan, &NoopRefetcher);
//! ```

pub mod cache;
pub mod config;
pub mod refetch;
pub mod stats;

pub use cache::{CacheEntry, QueryCache};
pub use config::CacheConfig;
pub use refetch::{NoopRefetcher, Refetcher};
pub use stats::CacheStats;
