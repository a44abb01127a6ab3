//! Hierarchical cache keys
//!
//! The client-side data layer indexes cached query results by an ordered
//! list of segments (project scope, resource category, filter values).
//! Keys are matched either exactly or by prefix, so invalidating a short
//! key can sweep a whole subtree of cached entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single element of a cache-key path
///
/// Most segments are plain identifiers, but list-style keys end in a
/// boolean filter flag (e.g. whether column metadata was included), so
/// segments carry both shapes. Serializes untagged: a key is a flat JSON
/// array of strings and booleans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegment {
    Text(String),
    Flag(bool),
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        KeySegment::Text(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        KeySegment::Text(value)
    }
}

impl From<bool> for KeySegment {
    fn from(value: bool) -> Self {
        KeySegment::Flag(value)
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Text(text) => write!(f, "{}", text),
            KeySegment::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

/// An ordered cache-key path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    /// Create a key from its segments
    pub fn new(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    /// The segments of this key, in order
    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this key lies in the subtree rooted at `prefix`
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl From<Vec<KeySegment>> for QueryKey {
    fn from(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Keys for cached table queries
pub mod table_keys {
    use super::QueryKey;

    /// Table list for one schema, split by whether column metadata is included
    pub fn list(project_ref: &str, schema: &str, include_columns: bool) -> QueryKey {
        QueryKey::new(vec![
            "tables-list".into(),
            project_ref.into(),
            schema.into(),
            include_columns.into(),
        ])
    }

    /// A single table, looked up by name within a schema
    pub fn retrieve(project_ref: &str, table: &str, schema: &str) -> QueryKey {
        QueryKey::new(vec![
            "tables-retrieve".into(),
            project_ref.into(),
            table.into(),
            schema.into(),
        ])
    }
}

/// Keys for the cross-schema entity listing (tables, views, foreign tables)
pub mod entity_type_keys {
    use super::QueryKey;

    pub fn list(project_ref: &str) -> QueryKey {
        QueryKey::new(vec!["entity-types-list".into(), project_ref.into()])
    }
}

/// Keys for cached database functions
pub mod database_function_keys {
    use super::QueryKey;

    /// The project-wide function list; not split by schema
    pub fn list(project_ref: &str) -> QueryKey {
        QueryKey::new(vec!["database-functions".into(), project_ref.into()])
    }
}

/// Keys for pg_cron job queries
pub mod cron_keys {
    use super::QueryKey;

    pub fn jobs(project_ref: &str) -> QueryKey {
        QueryKey::new(vec![
            "projects".into(),
            project_ref.into(),
            "cron-jobs".into(),
        ])
    }
}
