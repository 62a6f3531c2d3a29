//! Generic soft-delete record store over one entity table.

use crate::error::AppError;
use crate::record::{Record, CREATED_AT, EXCLUDED, ID, UPDATED_AT};
use crate::service::Filters;
use crate::store::{Condition, DataStore, Order, Query, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Largest `IN` list sent in one grouped count.
const MAX_IN_VALUES: usize = 1000;

/// list / get / create / update / soft-delete / count over one table. Excluded rows are
/// invisible to every read except `get_by_id_including_excluded`; nothing here deletes rows.
#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn DataStore>,
    table: String,
}

/// Projection and limit for `list_with`.
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    pub columns: Option<Vec<String>>,
    pub limit: Option<u32>,
}

impl RecordStore {
    pub fn new(store: Arc<dyn DataStore>, table: impl Into<String>) -> Self {
        RecordStore {
            store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn data_store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Non-excluded records, newest first.
    pub async fn list(&self, filters: &Filters) -> Result<Vec<Record>, AppError> {
        self.list_with(filters, &ListOptions::default()).await
    }

    pub async fn list_with(&self, filters: &Filters, opts: &ListOptions) -> Result<Vec<Record>, AppError> {
        let mut query = Query::new()
            .filter(live())
            .filters(filters.to_conditions())
            .order(Order::desc(CREATED_AT));
        query.columns = opts.columns.clone();
        query.limit = opts.limit;
        let rows = self
            .store
            .query(&self.table, &query)
            .await
            .map_err(|e| self.failed("list", e))?;
        Ok(rows)
    }

    /// The live record with `id`, or None.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Record>, AppError> {
        let row = self
            .store
            .query_one(&self.table, &[Condition::eq(ID, id), live()])
            .await
            .map_err(|e| self.failed("get_by_id", e))?;
        Ok(row)
    }

    /// Same lookup without the excluded filter.
    pub async fn get_by_id_including_excluded(&self, id: &str) -> Result<Option<Record>, AppError> {
        let row = self
            .store
            .query_one(&self.table, &[Condition::eq(ID, id)])
            .await
            .map_err(|e| self.failed("get_by_id_including_excluded", e))?;
        Ok(row)
    }

    /// Inserts with `excluded = false` whatever the input says. Id and timestamps are
    /// always generated by the store.
    pub async fn create(&self, fields: &Record) -> Result<Record, AppError> {
        let mut row = fields.clone();
        for generated in [ID, CREATED_AT, UPDATED_AT] {
            row.remove(generated);
        }
        row.insert(EXCLUDED, false);
        let created = self
            .store
            .insert(&self.table, &row)
            .await
            .map_err(|e| self.failed("create", e))?;
        tracing::debug!(table = %self.table, id = ?created.id(), "created");
        Ok(created)
    }

    /// Applies `partial` minus the protected columns (id, excluded, timestamps).
    /// Only live records can be updated; an excluded one is reported as `RowNotFound`.
    pub async fn update(&self, id: &str, partial: &Record) -> Result<Record, AppError> {
        let fields = partial.without_protected();
        let updated = self
            .store
            .update_where(&self.table, &fields, id, &[live()])
            .await
            .map_err(|e| self.failed("update", e))?;
        Ok(updated)
    }

    /// Marks the record excluded. Calling it again leaves the same state.
    pub async fn soft_delete(&self, id: &str) -> Result<(), AppError> {
        let mut fields = Record::new();
        fields.insert(EXCLUDED, true);
        self.store
            .update_where(&self.table, &fields, id, &[])
            .await
            .map_err(|e| self.failed("soft_delete", e))?;
        tracing::info!(table = %self.table, id = %id, "soft-deleted");
        Ok(())
    }

    pub async fn count(&self, filters: &Filters) -> Result<u64, AppError> {
        let mut conditions = vec![live()];
        conditions.extend(filters.to_conditions());
        let n = self
            .store
            .count_where(&self.table, &conditions)
            .await
            .map_err(|e| self.failed("count", e))?;
        Ok(n)
    }

    /// Live record counts per value of `field`, restricted to `values`. Values with no
    /// live record are absent from the map. One store request per thousand values.
    pub async fn count_by(&self, field: &str, values: &[Value]) -> Result<HashMap<String, u64>, AppError> {
        let mut counts = HashMap::new();
        for chunk in values.chunks(MAX_IN_VALUES) {
            let conditions = [live(), Condition::is_in(field, chunk.to_vec())];
            let part = self
                .store
                .count_grouped(&self.table, field, &conditions)
                .await
                .map_err(|e| self.failed("count_by", e))?;
            counts.extend(part);
        }
        Ok(counts)
    }

    fn failed(&self, op: &'static str, e: StoreError) -> AppError {
        tracing::error!(op, table = %self.table, kind = e.kind.as_str(), error = %e.message, "store call failed");
        AppError::Store(e)
    }
}

pub(crate) fn live() -> Condition {
    Condition::eq(EXCLUDED, false)
}
