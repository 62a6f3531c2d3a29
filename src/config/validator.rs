//! Catalog validation: unique names, reserved columns, relation and rule references.

use crate::config::{TableDef, RESERVED_COLUMNS};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

pub fn validate(tables: &[TableDef]) -> Result<(), ConfigError> {
    let mut by_name: HashMap<&str, &TableDef> = HashMap::new();
    for t in tables {
        if t.name.is_empty() {
            return Err(ConfigError::Validation("table name must not be empty".into()));
        }
        if by_name.insert(t.name.as_str(), t).is_some() {
            return Err(ConfigError::DuplicateTable(t.name.clone()));
        }
    }

    for t in tables {
        let mut seen = HashSet::new();
        for c in &t.columns {
            if RESERVED_COLUMNS.iter().any(|(r, _)| *r == c.name) {
                return Err(ConfigError::ReservedColumn {
                    table: t.name.clone(),
                    column: c.name.clone(),
                });
            }
            if !seen.insert(c.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "table {} declares column {} twice",
                    t.name, c.name
                )));
            }
        }

        for col in t.validation.keys() {
            if !t.has_column(col) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", t.name, col),
                });
            }
        }

        let mut relation_names = HashSet::new();
        for rel in &t.relations {
            if !relation_names.insert(rel.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "table {} declares relation {} twice",
                    t.name, rel.name
                )));
            }
            if !t.has_column(&rel.field) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", t.name, rel.field),
                });
            }
            let target = by_name.get(rel.target.as_str()).ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: rel.target.clone(),
            })?;
            for f in &rel.fields {
                if !target.has_column(f) {
                    return Err(ConfigError::MissingReference {
                        kind: "column",
                        id: format!("{}.{}", target.name, f),
                    });
                }
            }
        }
    }

    Ok(())
}
