use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::any::AnyPoolOptions;
use sqlx::migrate::MigrateDatabase;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool, Sqlite};

use crate::config::{self, DatabaseConfig};
use crate::crud::record::{create_index_sql, create_table_sql, drop_table_sql};
use crate::crud::Record;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Opens the shared pool described by `cfg`.
///
/// SQLite files (and their parent directory) are created when missing.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<AnyPool> {
    sqlx::any::install_default_drivers();
    let url = cfg.connection_url()?;

    if url.starts_with("sqlite:") && !url.contains(":memory:") {
        config::ensure_sqlite_parent_dir(&url)?;
        if !Sqlite::database_exists(&url).await.unwrap_or(false) {
            tracing::info!("Creating SQLite database at {}", url);
            Sqlite::create_database(&url).await?;
        }
    }

    let pool = AnyPoolOptions::new()
        .max_connections(cfg.max_connections)
        .max_lifetime(Duration::from_secs(cfg.session_live_time))
        .connect(&url)
        .await?;
    Ok(pool)
}

/// Creates the table and its indexes for one record type.
pub async fn create_table<M: Record>(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(&create_table_sql::<M>()).execute(pool).await?;
    for index in create_index_sql::<M>() {
        if let Err(e) = sqlx::query(&index).execute(pool).await {
            tracing::error!("Failed to create index on {}: {}", M::TABLE, e);
            return Err(anyhow::anyhow!("Schema creation failed for {}: {}", M::TABLE, e));
        }
    }
    tracing::debug!("Table {} ready", M::TABLE);
    Ok(())
}

pub async fn drop_table<M: Record>(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(&drop_table_sql::<M>()).execute(pool).await?;
    Ok(())
}

/// Creates every registered table. Existing tables are left as they are.
pub async fn create_all(pool: &AnyPool) -> anyhow::Result<()> {
    create_table::<User>(pool).await
}

/// Drops every registered table, data included.
pub async fn drop_all(pool: &AnyPool) -> anyhow::Result<()> {
    drop_table::<User>(pool).await
}

/// One pooled connection checked out for the duration of a request.
///
/// The connection goes back to the pool when the extractor is dropped, so it is
/// released whether the handler succeeds, returns an error or panics.
pub struct DbSession(pub PoolConnection<Any>);

impl DbSession {
    pub fn conn(&mut self) -> &mut AnyConnection {
        &mut self.0
    }
}

impl FromRequestParts<AppState> for DbSession {
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(state.db.acquire().await?))
    }
}
