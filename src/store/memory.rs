//! In-process store. Counts requests per table and can enforce a physical column set,
//! so schema mismatches and request fan-out are observable without a database.

use crate::config::EntityCatalog;
use crate::record::{Record, CREATED_AT, EXCLUDED, ID, UPDATED_AT};
use crate::store::{Condition, DataStore, Query, StoreError, StoreErrorKind};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct Table {
    rows: Vec<Record>,
    /// Physical columns; None accepts any field.
    columns: Option<HashSet<String>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    /// When set, tables must be registered before use.
    strict: bool,
    requests: RwLock<HashMap<String, u64>>,
    failures: RwLock<HashMap<String, StoreErrorKind>>,
}

impl MemoryStore {
    /// Permissive store: any table exists and accepts any field.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Store where only tables created through `create_table` exist.
    pub fn strict() -> Self {
        MemoryStore {
            strict: true,
            ..MemoryStore::default()
        }
    }

    /// Strict store with one table per catalog entry, limited to the declared columns.
    pub fn from_catalog(catalog: &EntityCatalog) -> Self {
        let store = MemoryStore::strict();
        for table in catalog.tables() {
            store.create_table(&table.name, Some(table.physical_columns()));
        }
        store
    }

    pub fn create_table(&self, name: &str, columns: Option<Vec<String>>) {
        let mut tables = write(&self.tables);
        tables.insert(
            name.to_string(),
            Table {
                rows: Vec::new(),
                columns: columns.map(|c| c.into_iter().collect()),
            },
        );
    }

    /// Removes a table entirely; later calls behave as if the migration never ran.
    pub fn drop_table(&self, name: &str) {
        write(&self.tables).remove(name);
    }

    /// Every later call on `table` fails with `kind` until `clear_failure`.
    pub fn fail_table(&self, table: &str, kind: StoreErrorKind) {
        write(&self.failures).insert(table.to_string(), kind);
    }

    pub fn clear_failure(&self, table: &str) {
        write(&self.failures).remove(table);
    }

    /// Number of calls issued against `table` since creation or the last reset.
    pub fn requests(&self, table: &str) -> u64 {
        read(&self.requests).get(table).copied().unwrap_or(0)
    }

    pub fn reset_requests(&self) {
        write(&self.requests).clear();
    }

    /// Raw rows, excluded ones included. Does not count as a request.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        read(&self.tables)
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn begin(&self, table: &str) -> Result<(), StoreError> {
        *write(&self.requests).entry(table.to_string()).or_insert(0) += 1;
        if let Some(kind) = read(&self.failures).get(table) {
            return Err(StoreError::new(*kind, table, format!("injected {} failure", kind.as_str())));
        }
        Ok(())
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&Table) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let tables = read(&self.tables);
        match tables.get(table) {
            Some(t) => f(t),
            None if self.strict => Err(StoreError::missing_table(table)),
            None => f(&Table::default()),
        }
    }

    fn with_table_mut<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut Table) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = write(&self.tables);
        if self.strict && !tables.contains_key(table) {
            return Err(StoreError::missing_table(table));
        }
        f(tables.entry(table.to_string()).or_default())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        self.begin(table)?;
        self.with_table(table, |t| {
            check_columns(table, t, query.conditions.iter().map(Condition::field))?;
            let mut rows: Vec<(usize, &Record)> = t
                .rows
                .iter()
                .enumerate()
                .filter(|(_, r)| matches_all(r, &query.conditions))
                .collect();
            if let Some(order) = &query.order {
                rows.sort_by(|(ia, a), (ib, b)| {
                    let ord = compare(a.get(&order.field), b.get(&order.field)).then(ia.cmp(ib));
                    if order.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
            let limit = query.limit.map(|n| n as usize).unwrap_or(usize::MAX);
            Ok(rows
                .into_iter()
                .take(limit)
                .map(|(_, r)| project(r, query.columns.as_deref()))
                .collect())
        })
    }

    async fn query_one(&self, table: &str, conditions: &[Condition]) -> Result<Option<Record>, StoreError> {
        self.begin(table)?;
        self.with_table(table, |t| {
            check_columns(table, t, conditions.iter().map(Condition::field))?;
            Ok(t.rows.iter().find(|r| matches_all(r, conditions)).cloned())
        })
    }

    async fn insert(&self, table: &str, fields: &Record) -> Result<Record, StoreError> {
        self.begin(table)?;
        self.with_table_mut(table, |t| {
            check_columns(table, t, fields.fields().map(|(k, _)| k.as_str()))?;
            let mut row = fields.clone();
            if row.is_blank(ID) {
                row.insert(ID, uuid::Uuid::new_v4().to_string());
            }
            let id = row.get(ID).cloned().unwrap_or(Value::Null);
            if t.rows.iter().any(|r| r.get(ID) == Some(&id)) {
                return Err(StoreError::new(
                    StoreErrorKind::Constraint,
                    table,
                    format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
                ));
            }
            if !row.contains(EXCLUDED) {
                row.insert(EXCLUDED, false);
            }
            let now = now();
            row.insert(CREATED_AT, now.clone());
            row.insert(UPDATED_AT, now);
            t.rows.push(row.clone());
            Ok(row)
        })
    }

    async fn update_where(
        &self,
        table: &str,
        fields: &Record,
        id: &str,
        guard: &[Condition],
    ) -> Result<Record, StoreError> {
        self.begin(table)?;
        self.with_table_mut(table, |t| {
            check_columns(table, t, fields.fields().map(|(k, _)| k.as_str()))?;
            check_columns(table, t, guard.iter().map(Condition::field))?;
            let row = t
                .rows
                .iter_mut()
                .find(|r| r.id() == Some(id) && matches_all(r, guard))
                .ok_or_else(|| StoreError::row_not_found(table, id))?;
            for (k, v) in fields.fields() {
                if k != ID {
                    row.insert(k.clone(), v.clone());
                }
            }
            row.insert(UPDATED_AT, now());
            Ok(row.clone())
        })
    }

    async fn count_where(&self, table: &str, conditions: &[Condition]) -> Result<u64, StoreError> {
        self.begin(table)?;
        self.with_table(table, |t| {
            check_columns(table, t, conditions.iter().map(Condition::field))?;
            Ok(t.rows.iter().filter(|r| matches_all(r, conditions)).count() as u64)
        })
    }

    async fn count_grouped(
        &self,
        table: &str,
        field: &str,
        conditions: &[Condition],
    ) -> Result<HashMap<String, u64>, StoreError> {
        self.begin(table)?;
        self.with_table(table, |t| {
            check_columns(table, t, std::iter::once(field).chain(conditions.iter().map(Condition::field)))?;
            let mut counts = HashMap::new();
            for r in t.rows.iter().filter(|r| matches_all(r, conditions)) {
                let key = match r.get(field) {
                    None | Some(Value::Null) => continue,
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                };
                *counts.entry(key).or_insert(0) += 1;
            }
            Ok(counts)
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn check_columns<'a>(
    table: &str,
    t: &Table,
    fields: impl Iterator<Item = &'a str>,
) -> Result<(), StoreError> {
    let Some(cols) = &t.columns else { return Ok(()) };
    for f in fields {
        if !cols.contains(f) {
            return Err(StoreError::missing_column(table, f));
        }
    }
    Ok(())
}

fn matches_all(row: &Record, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| matches(row, c))
}

fn matches(row: &Record, c: &Condition) -> bool {
    match c {
        Condition::Eq(f, v) => value_eq(row.get(f).unwrap_or(&Value::Null), v),
        Condition::Contains(f, needle) => match row.get(f) {
            Some(Value::String(s)) => s.to_lowercase().contains(&needle.to_lowercase()),
            Some(Value::Number(n)) => n.to_string().contains(needle.as_str()),
            _ => false,
        },
        Condition::In(f, values) => {
            let v = row.get(f).unwrap_or(&Value::Null);
            values.iter().any(|candidate| value_eq(v, candidate))
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

/// Nulls sort last in ascending order.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null)) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

fn project(row: &Record, columns: Option<&[String]>) -> Record {
    match columns {
        None => row.clone(),
        Some(cols) => {
            let mut out = Record::new();
            for c in cols {
                if let Some(v) = row.get(c) {
                    out.insert(c.clone(), v.clone());
                }
            }
            out
        }
    }
}
