//! Refetch hooks
//!
//! When an instruction carries an active refetch type, the cache needs
//! someone to actually re-run the underlying queries. That side effect
//! belongs to the surrounding data layer, so it comes in as a trait.

use invalidation_core::QueryKey;

/// Callback invoked for observed entries that an instruction wants
/// refetched eagerly
///
/// Implementations re-run the query behind `key` and eventually `put` a
/// fresh value back into the cache. Called with no cache locks held, so
/// an implementation may touch the cache directly.
pub trait Refetcher: Send + Sync {
    fn refetch(&self, key: &QueryKey);
}

/// Refetcher that drops every request
///
/// Useful when the caller only wants stale marking, or in tests.
#[derive(Debug, Default, Clone)]
pub struct NoopRefetcher;

impl Refetcher for NoopRefetcher {
    fn refetch(&self, _key: &QueryKey) {}
}
