//! Invalidation Planning Example
//!
//! Runs a few executed-SQL batches through the planner and prints the
//! resulting invalidation plans as the JSON the data layer consumes.

use anyhow::Result;
use invalidation_planner::plan_invalidations;

const PROJECT_REF: &str = "proj_demo";

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    println!("=== Invalidation Planning Example ===\n");

    plan_table_ddl()?;
    plan_function_ddl()?;
    plan_mixed_batch()?;
    plan_unsupported_sql()?;

    println!("\n=== All planning examples completed! ===");
    Ok(())
}

/// Example 1: table DDL fans out to four instructions
fn plan_table_ddl() -> Result<()> {
    println!("--- Example 1: Table DDL ---\n");

    let sql = "CREATE TABLE public.users (id int primary key, email text);";
    let plan = plan_invalidations(sql, PROJECT_REF);

    println!("SQL: {}", sql);
    println!("Plan ({} instructions):", plan.len());
    println!("{}\n", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// Example 2: function DDL collapses to one project-wide instruction
fn plan_function_ddl() -> Result<()> {
    println!("--- Example 2: Function DDL ---\n");

    let sql = "DROP FUNCTION util.cleanup_sessions();";
    let plan = plan_invalidations(sql, PROJECT_REF);

    println!("SQL: {}", sql);
    println!("Plan: {}\n", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// Example 3: multi-statement batches concatenate in statement order
fn plan_mixed_batch() -> Result<()> {
    println!("--- Example 3: Mixed batch ---\n");

    let sql = "\
        CREATE TABLE public.orders (id bigint); \
        select cron.schedule('nightly', '0 3 * * *', $$ delete from public.orders $$);";
    let plan = plan_invalidations(sql, PROJECT_REF);

    println!("SQL: {}", sql);
    println!("Plan has {} instructions:", plan.len());
    for instruction in &plan {
        println!("  {}", serde_json::to_string(&instruction)?);
    }
    println!();
    Ok(())
}

/// Example 4: unsupported and broken SQL both plan nothing
fn plan_unsupported_sql() -> Result<()> {
    println!("--- Example 4: Unsupported SQL ---\n");

    for sql in [
        "ALTER TABLE public.users ADD COLUMN name text;",
        "SELECT * FROM public.users;",
        "CREATE TABLE",
    ] {
        let plan = plan_invalidations(sql, PROJECT_REF);
        println!("{:45} -> {} instructions", sql, plan.len());
    }
    println!();
    Ok(())
}
