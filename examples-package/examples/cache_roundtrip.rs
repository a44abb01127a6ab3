//! Cache Roundtrip Example
//!
//! Populates the query cache the way a dashboard session would, executes
//! a DDL batch, applies the resulting invalidation plan, and shows which
//! entries went stale and which were handed off for refetching.

use anyhow::Result;
use invalidation_cache::{QueryCache, Refetcher};
use invalidation_core::keys::{entity_type_keys, table_keys};
use invalidation_core::QueryKey;
use invalidation_planner::plan_invalidations;
use serde_json::json;

const PROJECT_REF: &str = "proj_demo";

/// Refetcher that just reports what it was asked to refresh
struct PrintingRefetcher;

impl Refetcher for PrintingRefetcher {
    fn refetch(&self, key: &QueryKey) {
        println!("  refetching {}", key);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    println!("=== Cache Roundtrip Example ===\n");

    let cache = QueryCache::with_defaults();

    // A session has a few table queries cached, one of them on screen
    let users_detail = table_keys::retrieve(PROJECT_REF, "users", "public");
    cache.put(
        table_keys::list(PROJECT_REF, "public", true),
        json!([{ "name": "users", "schema": "public" }]),
    );
    cache.put(
        table_keys::list(PROJECT_REF, "public", false),
        json!([{ "name": "users" }]),
    );
    cache.put(users_detail.clone(), json!({ "name": "users", "rows": 42 }));
    cache.put(entity_type_keys::list(PROJECT_REF), json!(["table"]));
    cache.observe(&users_detail);

    println!("Cached {} entries\n", cache.len());

    // The user drops and recreates a table in the SQL editor
    let sql = "DROP TABLE public.users; CREATE TABLE public.users (id int);";
    let plan = plan_invalidations(sql, PROJECT_REF);
    println!("Executed: {}", sql);
    println!("Applying {} instructions:", plan.len());

    let matched = cache.apply_all(&plan, &PrintingRefetcher);
    println!("Matched {} cached entries\n", matched);

    for key in [
        table_keys::list(PROJECT_REF, "public", true),
        table_keys::list(PROJECT_REF, "public", false),
        users_detail.clone(),
        entity_type_keys::list(PROJECT_REF),
    ] {
        println!("  {} stale={:?}", key, cache.is_stale(&key));
    }

    // The refetch completes and replaces the observed entry
    cache.put(users_detail.clone(), json!({ "name": "users", "rows": 0 }));
    println!(
        "\nAfter refetch: {} stale={:?} observers={}",
        users_detail,
        cache.is_stale(&users_detail),
        cache.observer_count(&users_detail)
    );

    let stats = cache.stats();
    println!(
        "\nStats: {} stale marks, {} refetches, {} entries",
        stats.stale_marks(),
        stats.refetches(),
        stats.entry_count()
    );

    println!("\n=== Cache roundtrip completed! ===");
    Ok(())
}
