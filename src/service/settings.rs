//! Institution settings: a single live row, created on first save and updated in place after.

use crate::config::{EntityCatalog, TableDef, INSTITUTION_SETTINGS};
use crate::error::{AppError, ConfigError};
use crate::record::Record;
use crate::service::{Filters, RecordStore, RequestValidator};
use crate::store::DataStore;
use std::sync::Arc;

pub struct InstitutionSettingsService {
    records: RecordStore,
    table: TableDef,
}

impl InstitutionSettingsService {
    pub fn new(store: Arc<dyn DataStore>, catalog: &EntityCatalog) -> Result<Self, ConfigError> {
        Ok(InstitutionSettingsService {
            records: RecordStore::new(store, INSTITUTION_SETTINGS),
            table: catalog.require(INSTITUTION_SETTINGS)?.clone(),
        })
    }

    /// The live settings row, if one was ever saved.
    pub async fn current(&self) -> Result<Option<Record>, AppError> {
        Ok(self.records.list(&Filters::new()).await?.into_iter().next())
    }

    /// Merges `payload` onto the live row, or creates it. Extra live rows left by older
    /// writers are soft-deleted so exactly one stays live.
    pub async fn save(&self, payload: &Record) -> Result<Record, AppError> {
        let fields = self.table.storable(payload);
        RequestValidator::validate_partial(&self.table, &fields)?;
        let live = self.records.list(&Filters::new()).await?;
        let Some((newest, older)) = live.split_first() else {
            let created = self.records.create(&fields.without_protected()).await?;
            tracing::info!(id = ?created.id(), "institution settings created");
            return Ok(created);
        };
        for stale in older {
            if let Some(id) = stale.id() {
                tracing::warn!(id = %id, "retiring extra live settings row");
                self.records.soft_delete(id).await?;
            }
        }
        let id = newest
            .id()
            .ok_or_else(|| AppError::BadRequest("settings row without id".into()))?;
        self.records.update(id, &fields).await
    }

    /// Any settings row by id, retired ones included.
    pub async fn get_by_id_including_excluded(&self, id: &str) -> Result<Option<Record>, AppError> {
        self.records.get_by_id_including_excluded(id).await
    }
}
