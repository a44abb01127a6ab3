//! Table events extracted from executed SQL
//!
//! A second consumer of the same executed batches: telemetry wants to
//! know when a user created a table, loaded data into one, or enabled
//! row level security, without caring about cache keys. Events are
//! extracted from the parsed AST, so SQL text inside string literals
//! (dollar-quoted bodies included) never produces phantom events.
//!
//! Unlike the invalidation planner, events report the schema exactly as
//! written: an unqualified name yields `schema: None` rather than the
//! `public` default, since telemetry distinguishes the two.

use crate::classify::split_object_name;
use invalidation_core::{InvalidationError, Result};
use serde::{Deserialize, Serialize};
use sqlparser::ast::{AlterTableOperation, CopySource, ObjectName, Query, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// A table-level event observed in an executed SQL batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TableEvent {
    /// CREATE TABLE in any form, including CREATE TABLE AS and SELECT INTO
    Created {
        schema: Option<String>,
        #[serde(rename = "tableName")]
        table: String,
    },
    /// INSERT INTO or COPY ... FROM
    DataAdded {
        schema: Option<String>,
        #[serde(rename = "tableName")]
        table: String,
    },
    /// ALTER TABLE ... ENABLE ROW LEVEL SECURITY
    RlsEnabled {
        schema: Option<String>,
        #[serde(rename = "tableName")]
        table: String,
    },
}

/// Extract table events from an executed SQL batch
///
/// Fails soft the same way the planner does: unparseable input yields no
/// events.
pub fn table_events(sql: &str) -> Vec<TableEvent> {
    if sql.is_empty() {
        return Vec::new();
    }

    match try_events(sql) {
        Ok(events) => events,
        Err(error) => {
            debug!("skipping table events for unparseable SQL: {}", error);
            Vec::new()
        }
    }
}

fn try_events(sql: &str) -> Result<Vec<TableEvent>> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|error| InvalidationError::Parse(error.to_string()))?;

    let mut events = Vec::new();
    for statement in &statements {
        events.extend(statement_events(statement));
    }
    Ok(events)
}

fn statement_events(statement: &Statement) -> Vec<TableEvent> {
    match statement {
        Statement::CreateTable(create) => created(&create.name).into_iter().collect(),
        Statement::Insert(insert) => data_added(&insert.table_name).into_iter().collect(),
        Statement::Copy {
            source: CopySource::Table { table_name, .. },
            to: false,
            ..
        } => data_added(table_name).into_iter().collect(),
        Statement::Query(query) => select_into_events(query),
        Statement::AlterTable {
            name, operations, ..
        } => rls_events(name, operations),
        _ => Vec::new(),
    }
}

/// SELECT ... INTO target FROM ... creates the target table
fn select_into_events(query: &Query) -> Vec<TableEvent> {
    if let SetExpr::Select(select) = query.body.as_ref() {
        if let Some(into) = &select.into {
            return created(&into.name).into_iter().collect();
        }
    }
    Vec::new()
}

fn rls_events(name: &ObjectName, operations: &[AlterTableOperation]) -> Vec<TableEvent> {
    let enables_rls = operations
        .iter()
        .any(|op| matches!(op, AlterTableOperation::EnableRowLevelSecurity));
    if !enables_rls {
        return Vec::new();
    }

    let Some((schema, table)) = split_object_name(name) else {
        return Vec::new();
    };
    vec![TableEvent::RlsEnabled { schema, table }]
}

fn created(name: &ObjectName) -> Option<TableEvent> {
    split_object_name(name).map(|(schema, table)| TableEvent::Created { schema, table })
}

fn data_added(name: &ObjectName) -> Option<TableEvent> {
    split_object_name(name).map(|(schema, table)| TableEvent::DataAdded { schema, table })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(schema: Option<&str>, table: &str) -> TableEvent {
        TableEvent::Created {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }

    fn data_added(schema: Option<&str>, table: &str) -> TableEvent {
        TableEvent::DataAdded {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }

    fn rls_enabled(schema: Option<&str>, table: &str) -> TableEvent {
        TableEvent::RlsEnabled {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }

    #[test]
    fn test_detects_basic_create_table() {
        let events = table_events("CREATE TABLE users (id INT PRIMARY KEY)");
        assert_eq!(events, vec![created(None, "users")]);
    }

    #[test]
    fn test_detects_create_table_with_schema() {
        let events = table_events("CREATE TABLE public.users (id INT)");
        assert_eq!(events, vec![created(Some("public"), "users")]);
    }

    #[test]
    fn test_detects_create_table_if_not_exists() {
        let events = table_events("CREATE TABLE IF NOT EXISTS users (id INT)");
        assert_eq!(events, vec![created(None, "users")]);
    }

    #[test]
    fn test_detects_temporary_and_unlogged_tables() {
        assert_eq!(
            table_events("CREATE TEMPORARY TABLE temp_users (id INT)"),
            vec![created(None, "temp_users")]
        );
        assert_eq!(
            table_events("CREATE TEMP TABLE temp_users (id INT)"),
            vec![created(None, "temp_users")]
        );
        assert_eq!(
            table_events("CREATE UNLOGGED TABLE fast_table (id INT)"),
            vec![created(None, "fast_table")]
        );
        assert_eq!(
            table_events("CREATE TEMP TABLE IF NOT EXISTS temp_users (id INT)"),
            vec![created(None, "temp_users")]
        );
    }

    #[test]
    fn test_quoted_identifiers_are_unquoted() {
        let events = table_events(r#"CREATE TABLE "public"."user_table" (id INT)"#);
        assert_eq!(events, vec![created(Some("public"), "user_table")]);
    }

    #[test]
    fn test_detects_insert() {
        let events = table_events("INSERT INTO users (name) VALUES ('John')");
        assert_eq!(events, vec![data_added(None, "users")]);

        let events = table_events("INSERT INTO public.users (name) VALUES ('John')");
        assert_eq!(events, vec![data_added(Some("public"), "users")]);

        let events = table_events(r#"INSERT INTO "auth"."users" (id) VALUES (1)"#);
        assert_eq!(events, vec![data_added(Some("auth"), "users")]);
    }

    #[test]
    fn test_update_is_not_data_added() {
        let events = table_events("UPDATE users SET name = 'John'");
        assert!(events.is_empty());
    }

    #[test]
    fn test_detects_copy_from() {
        let events = table_events("COPY users FROM '/tmp/users.csv'");
        assert_eq!(events, vec![data_added(None, "users")]);

        let events = table_events("COPY public.users FROM '/tmp/users.csv' WITH (FORMAT csv, HEADER)");
        assert_eq!(events, vec![data_added(Some("public"), "users")]);

        let events = table_events(r#"COPY "auth"."users" FROM '/tmp/users.csv'"#);
        assert_eq!(events, vec![data_added(Some("auth"), "users")]);
    }

    #[test]
    fn test_copy_to_is_not_data_added() {
        let events = table_events("COPY users TO '/tmp/users.csv'");
        assert!(events.is_empty());
    }

    #[test]
    fn test_detects_select_into() {
        let events = table_events("SELECT * INTO new_users FROM users");
        assert_eq!(events, vec![created(None, "new_users")]);

        let events = table_events("SELECT id, name INTO public.new_users FROM users");
        assert_eq!(events, vec![created(Some("public"), "new_users")]);

        let events = table_events(r#"SELECT * INTO "backup"."users_2024" FROM users"#);
        assert_eq!(events, vec![created(Some("backup"), "users_2024")]);
    }

    #[test]
    fn test_detects_create_table_as_select() {
        let events = table_events("CREATE TABLE new_users AS SELECT * FROM users");
        assert_eq!(events, vec![created(None, "new_users")]);

        let events = table_events(
            "CREATE TABLE IF NOT EXISTS new_users AS SELECT * FROM users WHERE active = true",
        );
        assert_eq!(events, vec![created(None, "new_users")]);
    }

    #[test]
    fn test_regular_select_is_not_an_event() {
        assert!(table_events("SELECT * FROM users").is_empty());
    }

    #[test]
    fn test_detects_enable_row_level_security() {
        let events = table_events("ALTER TABLE users ENABLE ROW LEVEL SECURITY");
        assert_eq!(events, vec![rls_enabled(None, "users")]);

        let events = table_events("ALTER TABLE public.users ENABLE ROW LEVEL SECURITY");
        assert_eq!(events, vec![rls_enabled(Some("public"), "users")]);
    }

    #[test]
    fn test_rls_detected_among_other_alterations() {
        let events =
            table_events("ALTER TABLE users ADD COLUMN test INT, ENABLE ROW LEVEL SECURITY");
        assert_eq!(events, vec![rls_enabled(None, "users")]);
    }

    #[test]
    fn test_disable_rls_is_not_an_event() {
        let events = table_events("ALTER TABLE users DISABLE ROW LEVEL SECURITY");
        assert!(events.is_empty());
    }

    #[test]
    fn test_sql_inside_string_literals_is_not_an_event() {
        let sql = "
            CREATE TABLE users (id INT);
            INSERT INTO logs VALUES ($$CREATE TABLE fake$$);
            INSERT INTO users VALUES (1);
        ";
        let events = table_events(sql);
        assert_eq!(
            events,
            vec![
                created(None, "users"),
                data_added(None, "logs"),
                data_added(None, "users"),
            ]
        );
    }

    #[test]
    fn test_mixed_batch_keeps_only_table_events_in_order() {
        let sql = "
            CREATE TABLE users (id INT);
            CREATE FUNCTION test() RETURNS INT AS $$ BEGIN RETURN 1; END $$ LANGUAGE plpgsql;
            INSERT INTO users (id) VALUES (1);
            ALTER TABLE users ENABLE ROW LEVEL SECURITY;
            CREATE VIEW user_view AS SELECT * FROM users;
        ";
        let events = table_events(sql);
        assert_eq!(
            events,
            vec![
                created(None, "users"),
                data_added(None, "users"),
                rls_enabled(None, "users"),
            ]
        );
    }

    #[test]
    fn test_non_table_batch_yields_nothing() {
        let sql = "
            CREATE VIEW user_view AS SELECT * FROM users;
            SELECT * FROM users;
        ";
        assert!(table_events(sql).is_empty());
    }

    #[test]
    fn test_identifiers_with_numbers_and_underscores() {
        assert_eq!(
            table_events("CREATE TABLE table123 (id INT)"),
            vec![created(None, "table123")]
        );
        assert_eq!(
            table_events("CREATE TABLE user_accounts (id INT)"),
            vec![created(None, "user_accounts")]
        );
    }

    #[test]
    fn test_unparseable_sql_yields_nothing() {
        assert!(table_events("CREATE TABLE").is_empty());
        assert!(table_events("").is_empty());
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let events = table_events("CREATE TABLE public.users (id INT)");
        let json = serde_json::to_value(&events).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "type": "created", "schema": "public", "tableName": "users" }
            ])
        );
    }
}
