//! SQL-to-invalidation planning
//!
//! Turns a batch of executed SQL statements into the list of cache
//! entries the client-side data layer must invalidate, and how. The
//! planner is a pure function of its inputs and fails soft: SQL it cannot
//! parse or does not recognize plans no invalidations at all. A missed
//! invalidation only leaves a cache entry one refresh cycle stale,
//! whereas an error here would break the request-completion path.

use crate::classify::{classify_statement, DdlAction};
use invalidation_core::keys::{cron_keys, database_function_keys, entity_type_keys, table_keys};
use invalidation_core::{InvalidationError, InvalidationInstruction, RefetchType, Result};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Plan the cache invalidations for an executed SQL batch
///
/// `sql` may hold any number of semicolon-separated statements; the
/// resulting instructions are concatenated in statement order with no
/// cross-statement deduplication. An empty `sql` or `project_ref`, a
/// parse failure, or a batch with no recognized DDL all yield an empty
/// plan. This function never fails.
pub fn plan_invalidations(sql: &str, project_ref: &str) -> Vec<InvalidationInstruction> {
    if sql.is_empty() || project_ref.is_empty() {
        return Vec::new();
    }

    match try_plan(sql, project_ref) {
        Ok(plan) => plan,
        Err(error) => {
            debug!("skipping invalidation for unparseable SQL: {}", error);
            Vec::new()
        }
    }
}

fn try_plan(sql: &str, project_ref: &str) -> Result<Vec<InvalidationInstruction>> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|error| InvalidationError::Parse(error.to_string()))?;

    let mut plan = Vec::new();
    for statement in &statements {
        for action in classify_statement(statement) {
            plan.extend(instructions_for(&action, project_ref));
        }
    }

    if !plan.is_empty() {
        debug!(
            "planned {} invalidations for {} statements",
            plan.len(),
            statements.len()
        );
    }
    Ok(plan)
}

/// The fixed instruction set for one classified action
///
/// Shapes and ordering are part of the contract: consumers assert on
/// positional output.
fn instructions_for(action: &DdlAction, project_ref: &str) -> Vec<InvalidationInstruction> {
    match action {
        DdlAction::Table { schema, name } => vec![
            // Both cached variants of the schema's table list, matched
            // exactly so sibling schemas stay untouched.
            InvalidationInstruction::new(table_keys::list(project_ref, schema, true))
                .with_exact(true),
            InvalidationInstruction::new(table_keys::list(project_ref, schema, false))
                .with_exact(true),
            // The table's own detail entry is refetched eagerly while
            // someone is looking at it.
            InvalidationInstruction::new(table_keys::retrieve(project_ref, name, schema))
                .with_refetch(RefetchType::Active),
            // Entity listings aggregate across schemas; sweep the subtree.
            InvalidationInstruction::new(entity_type_keys::list(project_ref)).with_exact(false),
        ],
        // The function list is cached project-wide, so the instruction
        // does not vary with the schema or function name.
        DdlAction::Function { .. } => vec![InvalidationInstruction::new(
            database_function_keys::list(project_ref),
        )
        .with_refetch(RefetchType::Active)],
        DdlAction::Cron => vec![InvalidationInstruction::new(cron_keys::jobs(project_ref))
            .with_exact(false)
            .with_refetch(RefetchType::Active)],
    }
}
