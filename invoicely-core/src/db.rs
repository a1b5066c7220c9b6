use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::store::{MemoryStore, PgStore, RecordStore, StoreError};

/// Create a Postgres connection pool for the record store.
///
/// Returns a `sqlx::PgPool` or an error if the pool cannot be created.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Opens the record store named by the configuration.
///
/// With `DATABASE_URL` set, connects to Postgres and creates the schema if
/// needed; otherwise falls back to an empty in-memory store.
pub async fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config.db_max_connections).await?;
            let store = PgStore::new(pool);
            store.ensure_schema().await?;
            info!("Connected to Postgres record store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
