//! SIAGOV backend core: a soft-delete record store over catalog tables, per-entity
//! adapters, a manual join resolver, and the HTTP surface built on them.

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod record;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_catalog, siagov_catalog, EntityCatalog, Settings, StoreBackend, TableDef};
pub use error::{AppError, ConfigError};
pub use migration::ensure_tables;
pub use record::Record;
pub use routes::app;
pub use service::{
    CategoryService, DocumentService, Filters, InstitutionSettingsService, JoinResolver, ProcessService,
    RecordStore, TicketService,
};
pub use state::AppState;
pub use store::{DataStore, MemoryStore, PgStore, StoreError, StoreErrorKind};
