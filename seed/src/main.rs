//! Seeds reference data through the record store. Rows whose key field already matches a
//! live row are skipped, so running it twice is harmless.
//!
//! Run from repo root: `cargo run -p siagov-seed`

use serde_json::{json, Value};
use siagov::config::{BANKS, DOCUMENT_CATEGORIES, POSITIONS, SPHERES};
use siagov::{
    ensure_tables, load_catalog, AppError, AppState, DataStore, Filters, MemoryStore, PgStore, Record, RecordStore,
    Settings, StoreBackend,
};
use std::sync::Arc;

/// Inserts `rows` into `records` unless a live row with the same `key` exists. Returns the
/// live row for every input, created or found.
async fn upsert_by(records: &RecordStore, key: &str, rows: Vec<Value>) -> Result<Vec<Record>, AppError> {
    let mut out = Vec::with_capacity(rows.len());
    for v in rows {
        let Some(row) = Record::from_value(v) else {
            continue;
        };
        let Some(k) = row.get(key).cloned() else {
            continue;
        };
        match records.list(&Filters::new().eq(key, k)).await?.into_iter().next() {
            Some(existing) => out.push(existing),
            None => {
                let created = records.create(&row).await?;
                tracing::info!(table = %records.table(), id = ?created.id(), "seeded");
                out.push(created);
            }
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("siagov=info,siagov_seed=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let catalog = Arc::new(load_catalog(settings.catalog_path.as_deref()).await?);
    let store: Arc<dyn DataStore> = match settings.backend {
        StoreBackend::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(&settings.database_url)
                .await?;
            ensure_tables(&pool, &settings.schema, &catalog).await?;
            Arc::new(PgStore::new(pool, settings.schema.clone(), catalog.clone()))
        }
        StoreBackend::Memory => Arc::new(MemoryStore::from_catalog(&catalog)),
    };
    let state = AppState::new(store.clone(), catalog)?;

    let banks = RecordStore::new(store.clone(), BANKS);
    upsert_by(
        &banks,
        "code",
        vec![
            json!({ "code": "001", "name": "Banco do Brasil S.A.", "short_name": "BB" }),
            json!({ "code": "033", "name": "Banco Santander (Brasil) S.A.", "short_name": "Santander" }),
            json!({ "code": "104", "name": "Caixa Econômica Federal", "short_name": "CEF" }),
            json!({ "code": "237", "name": "Banco Bradesco S.A.", "short_name": "Bradesco" }),
            json!({ "code": "341", "name": "Itaú Unibanco S.A.", "short_name": "Itaú" }),
        ],
    )
    .await?;

    let spheres = RecordStore::new(store.clone(), SPHERES);
    upsert_by(
        &spheres,
        "name",
        vec![json!({ "name": "Municipal" }), json!({ "name": "Estadual" }), json!({ "name": "Federal" })],
    )
    .await?;

    let positions = RecordStore::new(store.clone(), POSITIONS);
    upsert_by(
        &positions,
        "name",
        vec![
            json!({ "name": "Secretário(a)", "level": 1 }),
            json!({ "name": "Diretor(a)", "level": 2 }),
            json!({ "name": "Coordenador(a)", "level": 3 }),
            json!({ "name": "Assessor(a)", "level": 4 }),
        ],
    )
    .await?;

    let categories = RecordStore::new(store.clone(), DOCUMENT_CATEGORIES);
    let seeded = upsert_by(
        &categories,
        "name",
        vec![
            json!({ "name": "Atos Normativos" }),
            json!({ "name": "Contratos" }),
            json!({ "name": "Ofícios" }),
        ],
    )
    .await?;
    let subcategories: [(&str, &[&str]); 2] = [
        ("Atos Normativos", &["Decretos", "Portarias", "Resoluções"]),
        ("Contratos", &["Aditivos", "Convênios"]),
    ];
    for (category, names) in subcategories {
        let Some(cat_id) = seeded
            .iter()
            .find(|c| c.get_str("name") == Some(category))
            .and_then(|c| c.id())
        else {
            continue;
        };
        let existing = state.categories.subcategories(Some(cat_id)).await?;
        for name in names {
            if existing.iter().any(|s| s.get_str("name") == Some(*name)) {
                continue;
            }
            state
                .categories
                .create_subcategory(&Record::from_value(json!({ "name": name, "category_id": cat_id })).unwrap_or_default())
                .await?;
        }
    }

    tracing::info!("reference data seeded");
    Ok(())
}
