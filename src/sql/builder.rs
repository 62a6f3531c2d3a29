//! Builds parameterized SELECT, COUNT, INSERT and UPDATE from a catalog table.
//! Identifiers are always quoted; values are always bound as parameters.

use crate::config::TableDef;
use crate::record::{Record, ID, UPDATED_AT};
use crate::store::{Condition, Query};
use serde_json::Value;

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Binds `v` and returns its placeholder, cast to the column type when the catalog knows it.
    fn placeholder(&mut self, table: &TableDef, column: &str, v: Value) -> String {
        let n = self.push_param(v);
        table
            .pg_type(column)
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }
}

/// Column expression for SELECT/RETURNING. numeric and schema-qualified types come back as text
/// so they decode without a custom type.
fn column_expr(table: &TableDef, column: &str) -> String {
    let q = quoted(column);
    match table.pg_type(column) {
        Some(t) if t == "numeric" || t.contains('.') => format!("{}::text AS {}", q, q),
        _ => q,
    }
}

fn select_column_list(table: &TableDef, columns: Option<&[String]>) -> String {
    let cols = match columns {
        Some(cols) => cols.to_vec(),
        None => table.physical_columns(),
    };
    cols.iter()
        .map(|c| column_expr(table, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escapes LIKE wildcards so the needle matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn where_clause(q: &mut QueryBuf, table: &TableDef, conditions: &[Condition]) -> String {
    let mut parts = Vec::new();
    for c in conditions {
        match c {
            Condition::Eq(col, Value::Null) => parts.push(format!("{} IS NULL", quoted(col))),
            Condition::Eq(col, v) => {
                let ph = q.placeholder(table, col, v.clone());
                parts.push(format!("{} = {}", quoted(col), ph));
            }
            Condition::Contains(col, needle) => {
                let n = q.push_param(Value::String(like_pattern(needle)));
                parts.push(format!("{}::text ILIKE ${}", quoted(col), n));
            }
            Condition::In(col, values) => {
                if values.is_empty() {
                    parts.push("FALSE".to_string());
                    continue;
                }
                let phs: Vec<String> = values
                    .iter()
                    .map(|v| q.placeholder(table, col, v.clone()))
                    .collect();
                parts.push(format!("{} IN ({})", quoted(col), phs.join(", ")));
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT with conditions, optional ORDER BY, LIMIT and column projection.
pub fn select(schema: &str, table: &TableDef, query: &Query) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, &query.conditions);
    let order_sql = query
        .order
        .as_ref()
        .map(|o| format!(" ORDER BY {} {}", quoted(&o.field), if o.descending { "DESC" } else { "ASC" }))
        .unwrap_or_default();
    let limit_sql = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}",
        select_column_list(table, query.columns.as_deref()),
        qualified_table(schema, &table.name),
        where_sql,
        order_sql,
        limit_sql
    );
    q
}

/// SELECT of at most one row.
pub fn select_one(schema: &str, table: &TableDef, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, conditions);
    q.sql = format!(
        "SELECT {} FROM {}{} LIMIT 1",
        select_column_list(table, None),
        qualified_table(schema, &table.name),
        where_sql
    );
    q
}

/// COUNT(*) without row payload.
pub fn count(schema: &str, table: &TableDef, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, conditions);
    q.sql = format!(
        "SELECT COUNT(*) AS \"count\" FROM {}{}",
        qualified_table(schema, &table.name),
        where_sql
    );
    q
}

/// Per-value counts of `field`, keyed as text so every column type groups the same way.
pub fn count_by(schema: &str, table: &TableDef, field: &str, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, conditions);
    q.sql = format!(
        "SELECT {}::text AS \"key\", COUNT(*) AS \"count\" FROM {}{} GROUP BY {}",
        quoted(field),
        qualified_table(schema, &table.name),
        where_sql,
        quoted(field)
    );
    q
}

/// INSERT of the given fields. Columns not provided fall back to their DB defaults.
pub fn insert(schema: &str, table: &TableDef, fields: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (k, v) in fields.fields() {
        if k == ID && v.is_null() {
            continue;
        }
        placeholders.push(q.placeholder(table, k, v.clone()));
        cols.push(quoted(k));
    }
    let table_sql = qualified_table(schema, &table.name);
    let returning = select_column_list(table, None);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table_sql, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table_sql,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET the given fields and bump updated_at.
/// UPDATE of the row with `id`, narrowed by `guard`; RETURNING yields nothing when no row matches.
pub fn update(schema: &str, table: &TableDef, fields: &Record, id: &str, guard: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in fields.fields() {
        if k == ID || k == UPDATED_AT {
            continue;
        }
        let ph = q.placeholder(table, k, v.clone());
        sets.push(format!("{} = {}", quoted(k), ph));
    }
    sets.push(format!("{} = NOW()", quoted(UPDATED_AT)));
    let mut conditions = vec![Condition::eq(ID, id)];
    conditions.extend_from_slice(guard);
    let where_sql = where_clause(&mut q, table, &conditions);
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        qualified_table(schema, &table.name),
        sets.join(", "),
        where_sql,
        select_column_list(table, None)
    );
    q
}
