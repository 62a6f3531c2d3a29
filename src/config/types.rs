//! Catalog types: tables, physical columns, relations and per-column validation rules.

use crate::error::ConfigError;
use crate::record::{Record, CREATED_AT, EXCLUDED, ID, UPDATED_AT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Columns every table carries, with their PostgreSQL types.
pub const RESERVED_COLUMNS: [(&str, &str); 4] = [
    (ID, "uuid"),
    (EXCLUDED, "boolean"),
    (CREATED_AT, "timestamptz"),
    (UPDATED_AT, "timestamptz"),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// PostgreSQL type used for DDL and parameter casts; None means text.
    #[serde(rename = "type", default)]
    pub pg_type: Option<String>,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnDef {
    pub fn text(name: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            pg_type: None,
            nullable: true,
        }
    }

    pub fn typed(name: &str, pg_type: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            pg_type: Some(pg_type.to_string()),
            nullable: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Id-valued field resolved by the join resolver. The store declares no foreign key for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationDef {
    /// Key the related object is attached under (e.g. "category").
    pub name: String,
    /// Field on this table holding the related id (e.g. "category_id").
    pub field: String,
    /// Table the id points into.
    pub target: String,
    /// Columns fetched from the target; the id is always included.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl RelationDef {
    pub fn new(name: &str, field: &str, target: &str, fields: &[&str]) -> Self {
        RelationDef {
            name: name.to_string(),
            field: field.to_string(),
            target: target.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Projection sent to the target table: id first, then the display fields.
    pub fn projection(&self) -> Vec<String> {
        let mut cols = vec![ID.to_string()];
        for f in &self.fields {
            if f != ID {
                cols.push(f.clone());
            }
        }
        cols
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: Some(true),
            ..ValidationRule::default()
        }
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn format(mut self, f: &str) -> Self {
        self.format = Some(f.to_string());
        self
    }

    pub fn pattern(mut self, p: &str) -> Self {
        self.pattern = Some(p.to_string());
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| serde_json::Value::from(*v)).collect());
        self
    }
}

/// One entity table as it physically exists in the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    /// Business columns; the reserved columns are implicit.
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub relations: Vec<RelationDef>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

impl TableDef {
    pub fn new(name: &str, columns: Vec<ColumnDef>) -> Self {
        TableDef {
            name: name.to_string(),
            columns,
            relations: Vec::new(),
            validation: HashMap::new(),
        }
    }

    pub fn relation(mut self, rel: RelationDef) -> Self {
        self.relations.push(rel);
        self
    }

    pub fn rule(mut self, column: &str, rule: ValidationRule) -> Self {
        self.validation.insert(column.to_string(), rule);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// True for business and reserved columns alike.
    pub fn has_column(&self, name: &str) -> bool {
        RESERVED_COLUMNS.iter().any(|(c, _)| *c == name) || self.column(name).is_some()
    }

    /// Reserved columns followed by the business columns.
    pub fn physical_columns(&self) -> Vec<String> {
        RESERVED_COLUMNS
            .iter()
            .map(|(c, _)| c.to_string())
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    pub fn pg_type(&self, column: &str) -> Option<&str> {
        if let Some((_, t)) = RESERVED_COLUMNS.iter().find(|(c, _)| *c == column) {
            return Some(t);
        }
        self.column(column).and_then(|c| c.pg_type.as_deref())
    }

    pub fn find_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Subset of `fields` the physical table can store. Domain-only fields are dropped.
    pub fn storable(&self, fields: &Record) -> Record {
        let mut out = Record::new();
        for (k, v) in fields.fields() {
            if self.has_column(k) {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }
}

/// Every table the application knows, indexed by name.
#[derive(Clone, Debug)]
pub struct EntityCatalog {
    tables: Vec<TableDef>,
    by_name: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    tables: Vec<TableDef>,
}

impl EntityCatalog {
    /// Validates and indexes the tables.
    pub fn new(tables: Vec<TableDef>) -> Result<Self, ConfigError> {
        crate::config::validate(&tables)?;
        let by_name = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Ok(EntityCatalog { tables, by_name })
    }

    /// Parses `{ "tables": [...] }`.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_json::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))?;
        EntityCatalog::new(file.tables)
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    pub fn require(&self, name: &str) -> Result<&TableDef, ConfigError> {
        self.table(name).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn documents() -> TableDef {
        TableDef::new("documents", vec![ColumnDef::text("title"), ColumnDef::typed("category_id", "uuid")])
    }

    #[test]
    fn storable_keeps_only_physical_columns() {
        let input = Record::from_value(json!({
            "id": "d1",
            "title": "Portaria 12",
            "content": "long text",
            "token_usage": 120,
            "version": 2,
            "legal_basis": "Lei 8.666"
        }))
        .unwrap();
        let out = documents().storable(&input);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get_str("title"), Some("Portaria 12"));
        assert_eq!(out.get_str("id"), Some("d1"));
    }

    #[test]
    fn reserved_columns_have_types() {
        let t = documents();
        assert_eq!(t.pg_type("id"), Some("uuid"));
        assert_eq!(t.pg_type("excluded"), Some("boolean"));
        assert_eq!(t.pg_type("category_id"), Some("uuid"));
        assert_eq!(t.pg_type("title"), None);
        assert_eq!(t.physical_columns().len(), 6);
    }

    #[test]
    fn relation_projection_always_starts_with_id() {
        let r = RelationDef::new("category", "category_id", "document_categories", &["name", "id"]);
        assert_eq!(r.projection(), vec!["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn catalog_from_json() {
        let catalog = EntityCatalog::from_json(
            r#"{ "tables": [ { "name": "banks", "columns": [ { "name": "name" }, { "name": "code", "type": "integer" } ] } ] }"#,
        )
        .unwrap();
        let banks = catalog.require("banks").unwrap();
        assert_eq!(banks.pg_type("code"), Some("integer"));
        assert!(catalog.table("sectors").is_none());
    }
}
