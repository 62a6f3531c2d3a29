//! Administrative processes with parent process and sector resolved.
//!
//! Older deployments may not have run the processes migration yet, so listing treats a
//! missing table as "no processes" instead of failing the page.

use crate::config::{EntityCatalog, TableDef, PROCESSES};
use crate::error::{AppError, ConfigError};
use crate::record::Record;
use crate::service::{Filters, JoinResolver, RecordStore, RequestValidator};
use crate::store::{DataStore, StoreErrorKind};
use std::sync::Arc;

const PARENT: &str = "parent_process_id";

pub struct ProcessService {
    records: RecordStore,
    table: TableDef,
    resolver: JoinResolver,
}

impl ProcessService {
    pub fn new(store: Arc<dyn DataStore>, catalog: &EntityCatalog) -> Result<Self, ConfigError> {
        Ok(ProcessService {
            records: RecordStore::new(store.clone(), PROCESSES),
            table: catalog.require(PROCESSES)?.clone(),
            resolver: JoinResolver::new(store),
        })
    }

    /// Live processes, newest first. A missing table yields an empty list.
    pub async fn list(&self, filters: &Filters) -> Result<Vec<Record>, AppError> {
        let mut rows = match self.records.list(filters).await {
            Ok(rows) => rows,
            Err(AppError::Store(e)) if e.kind == StoreErrorKind::MissingTable => {
                tracing::warn!(table = %e.table, cause = %e.message, "processes table missing, listing nothing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
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
        let fields = self.table.storable(input);
        RequestValidator::validate(&self.table, &fields)?;
        self.check_parent(&fields, None).await?;
        let row = self.records.create(&fields).await?;
        tracing::info!(id = ?row.id(), number = ?row.get_str("number"), "process registered");
        Ok(row)
    }

    pub async fn update(&self, id: &str, input: &Record) -> Result<Record, AppError> {
        let fields = self.table.storable(input);
        RequestValidator::validate_partial(&self.table, &fields)?;
        self.check_parent(&fields, Some(id)).await?;
        self.records.update(id, &fields).await
    }

    pub async fn soft_delete(&self, id: &str) -> Result<(), AppError> {
        self.records.soft_delete(id).await
    }

    /// A parent, when given, must be another live process.
    async fn check_parent(&self, fields: &Record, own_id: Option<&str>) -> Result<(), AppError> {
        if fields.is_blank(PARENT) {
            return Ok(());
        }
        let Some(parent) = fields.get_str(PARENT) else {
            return Err(AppError::Validation(format!("{} must be a string id", PARENT)));
        };
        if own_id == Some(parent) {
            return Err(AppError::Validation("a process cannot be its own parent".into()));
        }
        if self.records.get_by_id(parent).await?.is_none() {
            return Err(AppError::Validation(format!("parent process {} does not exist", parent)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{siagov_catalog, SECTORS};
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    fn record(v: Value) -> Record {
        Record::from_value(v).unwrap()
    }

    fn service() -> (Arc<MemoryStore>, ProcessService) {
        let catalog = siagov_catalog().unwrap();
        let mem = Arc::new(MemoryStore::from_catalog(&catalog));
        let svc = ProcessService::new(mem.clone(), &catalog).unwrap();
        (mem, svc)
    }

    #[tokio::test]
    async fn missing_table_lists_nothing() {
        let (mem, svc) = service();
        mem.drop_table(PROCESSES);
        assert!(svc.list(&Filters::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_store_errors_still_fail() {
        let (mem, svc) = service();
        mem.fail_table(PROCESSES, StoreErrorKind::Connection);
        let err = svc.list(&Filters::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Store(ref e) if e.kind == StoreErrorKind::Connection));
    }

    #[tokio::test]
    async fn list_and_detail_resolve_parent_and_sector() {
        let (mem, svc) = service();
        let sector = mem
            .insert(SECTORS, &record(json!({ "name": "Licitações", "acronym": "CPL" })))
            .await
            .unwrap();
        let parent = svc
            .create(&record(json!({ "number": "001/2024", "title": "Aquisição" })))
            .await
            .unwrap();
        let child = svc
            .create(&record(json!({
                "number": "001/2024-A",
                "parent_process_id": parent.id(),
                "sector_id": sector.id()
            })))
            .await
            .unwrap();

        let rows = svc.list(&Filters::new()).await.unwrap();
        let listed = rows.iter().find(|r| r.id() == child.id()).unwrap();
        assert_eq!(listed["parent"]["number"], json!("001/2024"));
        assert_eq!(listed["sector"]["acronym"], json!("CPL"));

        let got = svc.get(child.id().unwrap()).await.unwrap().unwrap();
        assert_eq!(got["parent"]["title"], json!("Aquisição"));
        assert_eq!(got["sector"]["name"], json!("Licitações"));
    }

    #[tokio::test]
    async fn unknown_parent_is_rejected() {
        let (_, svc) = service();
        let err = svc
            .create(&record(json!({
                "number": "002/2024",
                "parent_process_id": "5f0c4a43-3b8e-4a8e-9d55-7a0f8f1b2c3d"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn process_cannot_parent_itself() {
        let (_, svc) = service();
        let p = svc.create(&record(json!({ "number": "003/2024" }))).await.unwrap();
        let id = p.id().unwrap();
        let err = svc
            .update(id, &record(json!({ "parent_process_id": id })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn number_is_required() {
        let (mem, svc) = service();
        let err = svc.create(&record(json!({ "title": "No number" }))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(mem.requests(PROCESSES), 0);
    }
}
