//! Statement classification
//!
//! Maps parsed SQL statements onto the handful of DDL shapes that affect
//! cached dashboard queries. Everything else classifies to nothing and
//! contributes no invalidations.

use sqlparser::ast::{Expr, ObjectName, ObjectType, Query, SelectItem, SetExpr, Statement};

/// Schema assumed for unqualified object names
pub const DEFAULT_SCHEMA: &str = "public";

/// DDL shapes that require cache invalidation
///
/// CREATE and DROP map onto the same action: either way the cached list
/// and detail views for the object are out of date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlAction {
    /// CREATE TABLE or DROP TABLE
    Table { schema: String, name: String },
    /// CREATE FUNCTION or DROP FUNCTION
    Function { schema: String, name: String },
    /// SELECT invoking cron.schedule(...) or cron.unschedule(...)
    Cron,
}

/// Classify one parsed statement
///
/// DROP can name several objects in one statement, so this returns a list;
/// most statements yield zero or one action.
pub fn classify_statement(statement: &Statement) -> Vec<DdlAction> {
    match statement {
        Statement::CreateTable(create) => table_action(&create.name).into_iter().collect(),
        Statement::Drop {
            object_type: ObjectType::Table,
            names,
            ..
        } => names.iter().filter_map(table_action).collect(),
        Statement::CreateFunction { name, .. } => function_action(name).into_iter().collect(),
        Statement::DropFunction { func_desc, .. } => func_desc
            .iter()
            .filter_map(|desc| function_action(&desc.name))
            .collect(),
        Statement::Query(query) => cron_action(query).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn table_action(name: &ObjectName) -> Option<DdlAction> {
    let (schema, name) = split_object_name(name)?;
    Some(DdlAction::Table {
        schema: schema.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        name,
    })
}

fn function_action(name: &ObjectName) -> Option<DdlAction> {
    let (schema, name) = split_object_name(name)?;
    Some(DdlAction::Function {
        schema: schema.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        name,
    })
}

/// Split a possibly qualified object name into (schema, object)
///
/// Longer paths (database.schema.object) keep only the trailing two parts.
/// Quoting has already been stripped by the parser.
pub(crate) fn split_object_name(name: &ObjectName) -> Option<(Option<String>, String)> {
    let idents = &name.0;
    let object = idents.last()?.value.clone();
    let schema = if idents.len() >= 2 {
        Some(idents[idents.len() - 2].value.clone())
    } else {
        None
    };
    Some((schema, object))
}

/// Detect a pg_cron schedule/unschedule call in a SELECT projection
///
/// The arguments do not matter; any cron.schedule or cron.unschedule call
/// means the cached job list is out of date. One statement yields at most
/// one action no matter how many calls it contains.
fn cron_action(query: &Query) -> Option<DdlAction> {
    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        _ => return None,
    };
    for item in &select.projection {
        let expr = match item {
            SelectItem::UnnamedExpr(expr) => expr,
            SelectItem::ExprWithAlias { expr, .. } => expr,
            _ => continue,
        };
        if let Expr::Function(func) = expr {
            if is_cron_call(&func.name) {
                return Some(DdlAction::Cron);
            }
        }
    }
    None
}

fn is_cron_call(name: &ObjectName) -> bool {
    if name.0.len() != 2 {
        return false;
    }
    let schema = &name.0[0].value;
    let func = &name.0[1].value;
    schema.eq_ignore_ascii_case("cron")
        && (func.eq_ignore_ascii_case("schedule") || func.eq_ignore_ascii_case("unschedule"))
}
