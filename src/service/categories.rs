//! Document categories and their subcategories.

use crate::config::{EntityCatalog, TableDef, DOCUMENT_CATEGORIES, DOCUMENT_SUBCATEGORIES};
use crate::error::{AppError, ConfigError};
use crate::record::Record;
use crate::service::{Filters, JoinResolver, RecordStore, RequestValidator};
use crate::store::DataStore;
use std::sync::Arc;

const CATEGORY_ID: &str = "category_id";

pub struct CategoryService {
    categories: RecordStore,
    subcategories: RecordStore,
    category_table: TableDef,
    subcategory_table: TableDef,
    resolver: JoinResolver,
}

impl CategoryService {
    pub fn new(store: Arc<dyn DataStore>, catalog: &EntityCatalog) -> Result<Self, ConfigError> {
        Ok(CategoryService {
            categories: RecordStore::new(store.clone(), DOCUMENT_CATEGORIES),
            subcategories: RecordStore::new(store.clone(), DOCUMENT_SUBCATEGORIES),
            category_table: catalog.require(DOCUMENT_CATEGORIES)?.clone(),
            subcategory_table: catalog.require(DOCUMENT_SUBCATEGORIES)?.clone(),
            resolver: JoinResolver::new(store),
        })
    }

    pub async fn categories(&self, filters: &Filters) -> Result<Vec<Record>, AppError> {
        self.categories.list(filters).await
    }

    pub async fn create_category(&self, input: &Record) -> Result<Record, AppError> {
        let fields = self.category_table.storable(input);
        RequestValidator::validate(&self.category_table, &fields)?;
        self.categories.create(&fields).await
    }

    /// Creates a subcategory under a live category.
    pub async fn create_subcategory(&self, input: &Record) -> Result<Record, AppError> {
        let fields = self.subcategory_table.storable(input);
        RequestValidator::validate(&self.subcategory_table, &fields)?;
        let category_id = fields.get_str(CATEGORY_ID).unwrap_or_default();
        if self.categories.get_by_id(category_id).await?.is_none() {
            return Err(AppError::Validation(format!("category {} does not exist", category_id)));
        }
        self.subcategories.create(&fields).await
    }

    /// Live subcategories, optionally of one category, each with `category` attached.
    pub async fn subcategories(&self, category_id: Option<&str>) -> Result<Vec<Record>, AppError> {
        let filters = match category_id {
            Some(id) => Filters::new().eq(CATEGORY_ID, id),
            None => Filters::new(),
        };
        let mut rows = self.subcategories.list(&filters).await?;
        self.resolver
            .resolve_many(&mut rows, &self.subcategory_table.relations)
            .await?;
        Ok(rows)
    }
}
