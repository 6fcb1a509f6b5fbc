use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::repo::{FileStore, MemoryStore, PgStore};

/// Builds the file store: Postgres when a database URL is configured,
/// otherwise the in-memory store.
pub async fn connect_store(database_url: Option<&str>) -> anyhow::Result<Arc<dyn FileStore>> {
    let Some(url) = database_url else {
        warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    info!("database migrations applied");

    Ok(Arc::new(PgStore::new(db)))
}
