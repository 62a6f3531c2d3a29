//! External data store collaborator and its backends.

mod error;
pub mod memory;
pub mod postgres;
mod query;

pub use error::{StoreError, StoreErrorKind};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{Condition, Order, Query};

use crate::record::Record;
use async_trait::async_trait;
use std::collections::HashMap;

/// Capability set of the managed store. Implementations are shared handles, safe for concurrent use.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError>;

    /// First matching row, or None when no row matches.
    async fn query_one(&self, table: &str, conditions: &[Condition]) -> Result<Option<Record>, StoreError>;

    /// Insert and return the row as stored, including generated id and timestamps.
    async fn insert(&self, table: &str, fields: &Record) -> Result<Record, StoreError>;

    /// Update the row with `id` when it also matches every condition in `guard`.
    /// Fails with `RowNotFound` when no such row exists.
    async fn update_where(
        &self,
        table: &str,
        fields: &Record,
        id: &str,
        guard: &[Condition],
    ) -> Result<Record, StoreError>;

    async fn count_where(&self, table: &str, conditions: &[Condition]) -> Result<u64, StoreError>;

    /// Counts of matching rows per value of `field`, keyed by the value as text.
    /// Rows where `field` is null are not counted.
    async fn count_grouped(
        &self,
        table: &str,
        field: &str,
        conditions: &[Condition],
    ) -> Result<HashMap<String, u64>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
