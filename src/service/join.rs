//! Manual join resolution for id-valued fields the store has no foreign keys for.
//!
//! Lists resolve each relation with one batched `id IN (...)` lookup, so the number of
//! requests grows with the number of relation types, never with the number of rows.
//! Details resolve one record's relations with concurrent single-id lookups and fail fast.

use crate::config::RelationDef;
use crate::error::AppError;
use crate::record::{Record, ID};
use crate::store::{Condition, DataStore, Query};
use futures_util::future::try_join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct JoinResolver {
    store: Arc<dyn DataStore>,
}

impl JoinResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        JoinResolver { store }
    }

    /// Fetches `fields` of the rows of `table` whose id is in `ids`, keyed by id.
    pub async fn batch_fetch_by_ids(
        &self,
        table: &str,
        ids: &[Value],
        fields: &[String],
    ) -> Result<HashMap<String, Record>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = Query::new()
            .filter(Condition::is_in(ID, ids.to_vec()))
            .columns(fields.iter().cloned());
        let rows = self.store.query(table, &query).await.map_err(|e| {
            tracing::error!(op = "batch_fetch_by_ids", table = %table, error = %e.message, "store call failed");
            AppError::Store(e)
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.id().map(|id| (id.to_string(), r.clone())))
            .collect())
    }

    /// Attaches each relation's object to every record of the batch. Null or dangling ids
    /// leave the relation absent.
    pub async fn resolve_many(&self, records: &mut [Record], relations: &[RelationDef]) -> Result<(), AppError> {
        for rel in relations {
            let ids = distinct_ids(records, &rel.field);
            if ids.is_empty() {
                continue;
            }
            let related = self.batch_fetch_by_ids(&rel.target, &ids, &rel.projection()).await?;
            for r in records.iter_mut() {
                if let Some(obj) = key_of(r.get(&rel.field)).and_then(|k| related.get(&k)) {
                    r.insert(rel.name.clone(), obj.clone().into_value());
                }
            }
        }
        Ok(())
    }

    /// Resolves one record's relations concurrently. Any failing lookup fails the whole call.
    pub async fn resolve_one(&self, record: &mut Record, relations: &[RelationDef]) -> Result<(), AppError> {
        let populated: Vec<(&RelationDef, Value)> = relations
            .iter()
            .filter_map(|rel| {
                let v = record.get(&rel.field)?;
                key_of(Some(v)).map(|_| (rel, v.clone()))
            })
            .collect();
        let lookups = populated.iter().map(|(rel, id)| {
            let store = self.store.clone();
            let query = Query::new()
                .filter(Condition::eq(ID, id.clone()))
                .columns(rel.projection())
                .limit(1);
            async move {
                store.query(&rel.target, &query).await.map_err(|e| {
                    tracing::error!(op = "resolve_one", table = %rel.target, error = %e.message, "store call failed");
                    AppError::Store(e)
                })
            }
        });
        let results = try_join_all(lookups).await?;
        for ((rel, _), rows) in populated.iter().zip(results) {
            if let Some(obj) = rows.into_iter().next() {
                record.insert(rel.name.clone(), obj.into_value());
            }
        }
        Ok(())
    }
}

/// Map key for an id value: strings as-is, numbers by their text.
fn key_of(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Distinct non-null values of `field`, in first-seen order.
fn distinct_ids(records: &[Record], field: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for r in records {
        if let Some(k) = key_of(r.get(field)) {
            if seen.insert(k) {
                if let Some(v) = r.get(field) {
                    out.push(v.clone());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreErrorKind};
    use serde_json::json;

    fn record(v: Value) -> Record {
        Record::from_value(v).unwrap()
    }

    async fn seed(mem: &MemoryStore, table: &str, v: Value) -> String {
        mem.insert(table, &record(v)).await.unwrap().id().unwrap().to_string()
    }

    fn category() -> RelationDef {
        RelationDef::new("category", "category_id", "categories", &["name"])
    }

    #[test]
    fn distinct_ids_skips_nulls_and_duplicates() {
        let rows = vec![
            record(json!({ "c": "a" })),
            record(json!({ "c": null })),
            record(json!({ "c": "a" })),
            record(json!({ "c": "b" })),
            record(json!({})),
        ];
        assert_eq!(distinct_ids(&rows, "c"), vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn one_request_per_relation_regardless_of_rows() {
        let mem = Arc::new(MemoryStore::new());
        let a = seed(&mem, "categories", json!({ "name": "Atos" })).await;
        let b = seed(&mem, "categories", json!({ "name": "Contratos" })).await;
        let mut rows: Vec<Record> = (0..20)
            .map(|i| record(json!({ "category_id": if i % 2 == 0 { &a } else { &b } })))
            .collect();
        mem.reset_requests();

        let resolver = JoinResolver::new(mem.clone());
        resolver.resolve_many(&mut rows, &[category()]).await.unwrap();

        assert_eq!(mem.requests("categories"), 1);
        assert_eq!(rows[0]["category"]["name"], json!("Atos"));
        assert_eq!(rows[1]["category"]["name"], json!("Contratos"));
        assert!(rows[0]["category"].get("excluded").is_none());
    }

    #[tokio::test]
    async fn no_request_when_every_id_is_null() {
        let mem = Arc::new(MemoryStore::new());
        let mut rows = vec![record(json!({ "category_id": null })), record(json!({}))];
        JoinResolver::new(mem.clone())
            .resolve_many(&mut rows, &[category()])
            .await
            .unwrap();
        assert_eq!(mem.requests("categories"), 0);
        assert!(rows[0].get("category").is_none());
    }

    #[tokio::test]
    async fn dangling_reference_is_left_absent() {
        let mem = Arc::new(MemoryStore::new());
        let mut rows = vec![record(json!({ "category_id": "gone" }))];
        JoinResolver::new(mem.clone())
            .resolve_many(&mut rows, &[category()])
            .await
            .unwrap();
        assert!(rows[0].get("category").is_none());
    }

    #[tokio::test]
    async fn resolve_one_fails_fast() {
        let mem = Arc::new(MemoryStore::new());
        let a = seed(&mem, "categories", json!({ "name": "Atos" })).await;
        let mut doc = record(json!({ "category_id": a, "owner_id": "u1" }));
        mem.fail_table("users", StoreErrorKind::Connection);
        let rels = vec![category(), RelationDef::new("owner", "owner_id", "users", &["name"])];
        let err = JoinResolver::new(mem.clone())
            .resolve_one(&mut doc, &rels)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn resolve_one_attaches_each_populated_relation() {
        let mem = Arc::new(MemoryStore::new());
        let a = seed(&mem, "categories", json!({ "name": "Atos" })).await;
        let u = seed(&mem, "users", json!({ "name": "Ana" })).await;
        let mut doc = record(json!({ "category_id": a, "owner_id": u, "reviewer_id": null }));
        let rels = vec![
            category(),
            RelationDef::new("owner", "owner_id", "users", &["name"]),
            RelationDef::new("reviewer", "reviewer_id", "users", &["name"]),
        ];
        JoinResolver::new(mem.clone()).resolve_one(&mut doc, &rels).await.unwrap();
        assert_eq!(doc["category"]["name"], json!("Atos"));
        assert_eq!(doc["owner"]["name"], json!("Ana"));
        assert!(doc.get("reviewer").is_none());
        assert_eq!(mem.requests("users"), 2);
    }
}
