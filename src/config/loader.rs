//! Load the entity catalog from a JSON file, or fall back to the built-in one.

use crate::config::{siagov_catalog, EntityCatalog};
use crate::error::ConfigError;
use std::path::Path;

/// Reads `{ "tables": [...] }` from `path` when given; otherwise returns the built-in catalog.
pub async fn load_catalog(path: Option<&Path>) -> Result<EntityCatalog, ConfigError> {
    let Some(path) = path else {
        return siagov_catalog();
    };
    tracing::info!(path = %path.display(), "loading catalog");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    EntityCatalog::from_json(&raw)
}
