//! Documents: writes go through the table's allow-list, reads resolve category and subcategory.

use crate::config::{EntityCatalog, TableDef, DOCUMENTS};
use crate::error::{AppError, ConfigError};
use crate::record::Record;
use crate::service::{Filters, JoinResolver, RecordStore, RequestValidator};
use crate::store::DataStore;
use std::sync::Arc;

pub struct DocumentService {
    records: RecordStore,
    table: TableDef,
    resolver: JoinResolver,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DataStore>, catalog: &EntityCatalog) -> Result<Self, ConfigError> {
        Ok(DocumentService {
            records: RecordStore::new(store.clone(), DOCUMENTS),
            table: catalog.require(DOCUMENTS)?.clone(),
            resolver: JoinResolver::new(store),
        })
    }

    /// The part of a domain document the `documents` table can hold.
    pub fn storable(&self, input: &Record) -> Record {
        let out = self.table.storable(input);
        if out.len() < input.len() {
            let dropped: Vec<&str> = input
                .fields()
                .map(|(k, _)| k.as_str())
                .filter(|k| !out.contains(k))
                .collect();
            tracing::debug!(?dropped, "fields without a column dropped from document payload");
        }
        out
    }

    /// Live documents, newest first, with `category` and `subcategory` attached.
    pub async fn list(&self, filters: &Filters) -> Result<Vec<Record>, AppError> {
        let mut rows = self.records.list(filters).await?;
        self.resolver.resolve_many(&mut rows, &self.table.relations).await?;
        Ok(rows)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Record>, AppError> {
        let Some(mut row) = self.records.get_by_id(id).await? else {
            return Ok(None);
        };
        self.resolver.resolve_one(&mut row, &self.table.relations).await?;
        Ok(Some(row))
    }

    pub async fn create(&self, input: &Record) -> Result<Record, AppError> {
        let fields = self.storable(input);
        RequestValidator::validate(&self.table, &fields)?;
        self.records.create(&fields).await
    }

    pub async fn update(&self, id: &str, input: &Record) -> Result<Record, AppError> {
        let fields = self.storable(input);
        RequestValidator::validate_partial(&self.table, &fields)?;
        self.records.update(id, &fields).await
    }

    pub async fn soft_delete(&self, id: &str) -> Result<(), AppError> {
        self.records.soft_delete(id).await
    }

    pub async fn count(&self, filters: &Filters) -> Result<u64, AppError> {
        self.records.count(filters).await
    }
}
