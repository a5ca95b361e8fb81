//! Faceplay REST server.
//!
//! `STORE_BACKEND=memory` runs without a database; otherwise `DATABASE_URL` must point at Postgres.

use faceplay::{
    app, ensure_collections, ensure_database_exists, AppState, DocumentStore, MemoryStore, PgDocumentStore,
    Settings, StoreBackend, COLLECTIONS,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("faceplay=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let store: Arc<dyn DocumentStore> = match (settings.backend, settings.database_url.as_deref()) {
        (StoreBackend::Postgres, Some(database_url)) => {
            ensure_database_exists(database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(database_url)
                .await?;
            ensure_collections(&pool, &settings.schema, COLLECTIONS).await?;
            tracing::info!(schema = %settings.schema, "using postgres document store");
            Arc::new(PgDocumentStore::new(pool, settings.schema.clone()))
        }
        (StoreBackend::Postgres, None) => return Err(faceplay::ConfigError::Missing("DATABASE_URL").into()),
        (StoreBackend::Memory, _) => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let router = app(AppState::new(store), settings.body_limit);
    let listener = TcpListener::bind(&settings.bind).await?;
    tracing::info!("faceplay listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
