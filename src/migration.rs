//! Creates the catalog's tables on PostgreSQL when they are missing.
//! Tables carry no foreign keys; relations are resolved in the join resolver.

use crate::config::{EntityCatalog, TableDef, RESERVED_COLUMNS};
use crate::store::StoreError;
use sqlx::PgPool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn reserved_default(name: &str) -> &'static str {
    match name {
        "id" => " PRIMARY KEY DEFAULT gen_random_uuid()",
        "excluded" => " NOT NULL DEFAULT FALSE",
        _ => " NOT NULL DEFAULT NOW()",
    }
}

/// `CREATE TABLE IF NOT EXISTS` for one table: reserved columns first, then the declared ones.
pub fn create_table_sql(schema: &str, table: &TableDef) -> String {
    let mut col_defs: Vec<String> = RESERVED_COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}{}", quote(name), ty.to_uppercase(), reserved_default(name)))
        .collect();
    for c in &table.columns {
        let ty = c.pg_type.as_deref().unwrap_or("text");
        let mut def = format!("{} {}", quote(&c.name), ty.to_uppercase());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        col_defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\n  {}\n)",
        quote(schema),
        quote(&table.name),
        col_defs.join(",\n  ")
    )
}

/// Index backing the default listing (live rows, newest first).
pub fn live_index_sql(schema: &str, table: &TableDef) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {}.{} (\"excluded\", \"created_at\" DESC)",
        quote(&format!("{}_live_idx", table.name)),
        quote(schema),
        quote(&table.name)
    )
}

/// Creates the schema and every catalog table that does not exist yet. Existing tables are
/// left untouched, so columns added to the catalog later need a manual migration.
pub async fn ensure_tables(pool: &PgPool, schema: &str, catalog: &EntityCatalog) -> Result<(), StoreError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote(schema)))
        .execute(pool)
        .await
        .map_err(|e| StoreError::from_sqlx(schema, e))?;
    for table in catalog.tables() {
        for sql in [create_table_sql(schema, table), live_index_sql(schema, table)] {
            tracing::debug!(table = %table.name, sql = %sql, "migration");
            sqlx::query(&sql)
                .execute(pool)
                .await
                .map_err(|e| StoreError::from_sqlx(&table.name, e))?;
        }
    }
    tracing::info!(schema = %schema, tables = catalog.tables().len(), "tables ensured");
    Ok(())
}
