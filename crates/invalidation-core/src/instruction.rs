//! Cache invalidation instructions
//!
//! The planner reduces an executed SQL batch to a list of these
//! instructions. The consuming cache applies each one against its own
//! entries; the planner never touches the cache directly.

use crate::keys::QueryKey;
use serde::{Deserialize, Serialize};

/// How matching cache entries should be refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefetchType {
    /// Eagerly re-run queries that currently have observers, instead of
    /// only marking them stale
    Active,
}

/// A single cache-invalidation instruction
///
/// `exact: Some(true)` matches only the entry whose key equals `key`;
/// otherwise every entry in the subtree under `key` matches. The optional
/// refetch type upgrades the invalidation from "mark stale" to "refetch
/// now" for entries that are currently observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationInstruction {
    pub key: QueryKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refetch_type: Option<RefetchType>,
}

impl InvalidationInstruction {
    /// Create an instruction with no exactness or refetch modifier
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            exact: None,
            refetch_type: None,
        }
    }

    /// Set the exact-match flag
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = Some(exact);
        self
    }

    /// Set the refetch type
    pub fn with_refetch(mut self, refetch_type: RefetchType) -> Self {
        self.refetch_type = Some(refetch_type);
        self
    }

    /// Whether only an identical key should match
    pub fn is_exact(&self) -> bool {
        self.exact == Some(true)
    }

    /// Whether observed entries should be eagerly refetched
    pub fn wants_active_refetch(&self) -> bool {
        matches!(self.refetch_type, Some(RefetchType::Active))
    }

    /// Whether a cached entry under `key` is covered by this instruction
    pub fn matches(&self, key: &QueryKey) -> bool {
        if self.is_exact() {
            *key == self.key
        } else {
            key.starts_with(&self.key)
        }
    }
}
