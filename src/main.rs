//! SIAGOV server: reads settings from the environment, connects the store, serves the API.

use siagov::{app, ensure_tables, load_catalog, AppState, DataStore, MemoryStore, PgStore, Settings, StoreBackend};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("siagov=info")),
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
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::from_catalog(&catalog))
        }
    };

    let state = AppState::new(store, catalog)?;
    let listener = TcpListener::bind(&settings.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
