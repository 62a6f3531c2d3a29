//! Shared application state for all routes.

use crate::config::EntityCatalog;
use crate::error::ConfigError;
use crate::service::{
    CategoryService, DocumentService, InstitutionSettingsService, ProcessService, RecordStore, TicketService,
};
use crate::store::DataStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub catalog: Arc<EntityCatalog>,
    pub tickets: Arc<TicketService>,
    pub documents: Arc<DocumentService>,
    pub settings: Arc<InstitutionSettingsService>,
    pub processes: Arc<ProcessService>,
    pub categories: Arc<CategoryService>,
}

impl AppState {
    /// Builds every adapter over one store handle. Fails when the catalog lacks a table an
    /// adapter needs.
    pub fn new(store: Arc<dyn DataStore>, catalog: Arc<EntityCatalog>) -> Result<Self, ConfigError> {
        Ok(AppState {
            tickets: Arc::new(TicketService::new(store.clone(), &catalog)?),
            documents: Arc::new(DocumentService::new(store.clone(), &catalog)?),
            settings: Arc::new(InstitutionSettingsService::new(store.clone(), &catalog)?),
            processes: Arc::new(ProcessService::new(store.clone(), &catalog)?),
            categories: Arc::new(CategoryService::new(store.clone(), &catalog)?),
            store,
            catalog,
        })
    }

    /// Generic record store for a catalog table; unknown tables are a 404 at the HTTP layer.
    pub fn records(&self, table: &str) -> Option<RecordStore> {
        self.catalog
            .table(table)
            .map(|t| RecordStore::new(self.store.clone(), t.name.clone()))
    }
}
