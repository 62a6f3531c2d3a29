//! PostgreSQL backend: catalog-driven SQL through sqlx.

use crate::config::{EntityCatalog, TableDef};
use crate::record::Record;
use crate::sql::{self, PgBindValue, QueryBuf};
use crate::store::{Condition, DataStore, Query, StoreError, StoreErrorKind};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
    catalog: Arc<EntityCatalog>,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>, catalog: Arc<EntityCatalog>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
            catalog,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Identifiers come from the catalog only; an unknown table is reported as missing.
    fn table(&self, name: &str) -> Result<&TableDef, StoreError> {
        self.catalog.table(name).ok_or_else(|| StoreError::missing_table(name))
    }

    async fn fetch_all(&self, table: &str, q: &QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(table, e))?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn fetch_optional(&self, table: &str, q: &QueryBuf) -> Result<Option<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(table, e))?;
        Ok(row.as_ref().map(row_to_record))
    }
}

/// A uuid column compared against a non-uuid string can never match; Postgres would
/// reject the cast, so the query is answered locally.
fn unsatisfiable(table: &TableDef, conditions: &[Condition]) -> bool {
    let bad_uuid = |col: &str, v: &Value| {
        table.pg_type(col) == Some("uuid")
            && v.as_str().map(|s| uuid::Uuid::parse_str(s).is_err()).unwrap_or(false)
    };
    conditions.iter().any(|c| match c {
        Condition::Eq(col, v) => bad_uuid(col, v),
        Condition::In(col, vs) => !vs.is_empty() && vs.iter().all(|v| bad_uuid(col, v)),
        Condition::Contains(..) => false,
    })
}

/// Drops the non-uuid values from `IN` lists on uuid columns.
fn sanitize(table: &TableDef, conditions: &[Condition]) -> Vec<Condition> {
    conditions
        .iter()
        .map(|c| match c {
            Condition::In(col, vs) if table.pg_type(col) == Some("uuid") => Condition::In(
                col.clone(),
                vs.iter()
                    .filter(|v| v.as_str().map(|s| uuid::Uuid::parse_str(s).is_ok()).unwrap_or(true))
                    .cloned()
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect()
}

#[async_trait]
impl DataStore for PgStore {
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        let def = self.table(table)?;
        if unsatisfiable(def, &query.conditions) {
            return Ok(Vec::new());
        }
        let query = Query {
            conditions: sanitize(def, &query.conditions),
            ..query.clone()
        };
        let q = sql::select(&self.schema, def, &query);
        self.fetch_all(table, &q).await
    }

    async fn query_one(&self, table: &str, conditions: &[Condition]) -> Result<Option<Record>, StoreError> {
        let def = self.table(table)?;
        if unsatisfiable(def, conditions) {
            return Ok(None);
        }
        let q = sql::select_one(&self.schema, def, &sanitize(def, conditions));
        self.fetch_optional(table, &q).await
    }

    async fn insert(&self, table: &str, fields: &Record) -> Result<Record, StoreError> {
        let def = self.table(table)?;
        let q = sql::insert(&self.schema, def, fields);
        self.fetch_optional(table, &q)
            .await?
            .ok_or_else(|| StoreError::new(StoreErrorKind::Other, table, "insert returned no row"))
    }

    async fn update_where(
        &self,
        table: &str,
        fields: &Record,
        id: &str,
        guard: &[Condition],
    ) -> Result<Record, StoreError> {
        let def = self.table(table)?;
        if uuid::Uuid::parse_str(id).is_err() || unsatisfiable(def, guard) {
            return Err(StoreError::row_not_found(table, id));
        }
        let q = sql::update(&self.schema, def, fields, id, &sanitize(def, guard));
        self.fetch_optional(table, &q)
            .await?
            .ok_or_else(|| StoreError::row_not_found(table, id))
    }

    async fn count_where(&self, table: &str, conditions: &[Condition]) -> Result<u64, StoreError> {
        let def = self.table(table)?;
        if unsatisfiable(def, conditions) {
            return Ok(0);
        }
        let q = sql::count(&self.schema, def, &sanitize(def, conditions));
        let row = self.fetch_optional(table, &q).await?;
        Ok(row
            .and_then(|r| r.get("count").and_then(Value::as_u64))
            .unwrap_or(0))
    }

    async fn count_grouped(
        &self,
        table: &str,
        field: &str,
        conditions: &[Condition],
    ) -> Result<HashMap<String, u64>, StoreError> {
        let def = self.table(table)?;
        if unsatisfiable(def, conditions) {
            return Ok(HashMap::new());
        }
        let q = sql::count_by(&self.schema, def, field, &sanitize(def, conditions));
        let rows = self.fetch_all(table, &q).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                let key = r.get_str("key")?.to_string();
                Some((key, r.get("count").and_then(Value::as_u64).unwrap_or(0)))
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx("-", e))?;
        Ok(())
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut out = Record::new();
    for col in row.columns() {
        let name = col.name();
        out.insert(name, cell_to_value(row, name));
    }
    out
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339_opts(chrono::SecondsFormat::Micros, true));
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnDef;
    use serde_json::json;

    fn tickets() -> TableDef {
        TableDef::new("tickets", vec![ColumnDef::text("subject")])
    }

    #[test]
    fn non_uuid_id_cannot_match() {
        assert!(unsatisfiable(&tickets(), &[Condition::eq("id", "abc")]));
        assert!(!unsatisfiable(
            &tickets(),
            &[Condition::eq("id", "4f5c2a3e-8c1b-4e57-9a52-0d2f3a1b6c7d")]
        ));
        assert!(!unsatisfiable(&tickets(), &[Condition::eq("subject", "abc")]));
    }

    #[test]
    fn in_lists_drop_invalid_uuids() {
        let conds = sanitize(
            &tickets(),
            &[Condition::is_in(
                "id",
                vec![json!("bad"), json!("4f5c2a3e-8c1b-4e57-9a52-0d2f3a1b6c7d")],
            )],
        );
        assert_eq!(
            conds,
            vec![Condition::is_in("id", vec![json!("4f5c2a3e-8c1b-4e57-9a52-0d2f3a1b6c7d")])]
        );
    }
}
