//! Unit and HTTP-level tests.
//!
//! - **crud_tests**: the generic repository against an in-memory SQLite database
//! - **record_tests**: column registry, values and generated DDL
//! - **config_tests**: configuration layering and connection string derivation
//! - **error_tests**: error mapping and JSON error responses
//! - **api_tests**: `/ping` and the admin panel through the full router
//!
//! Run a single module with `cargo test crud_tests`.

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::db;

pub mod error_tests;

/// Fresh in-memory database with the application schema.
///
/// A single connection keeps every query on the same in-memory database.
pub(crate) async fn memory_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::create_all(&pool).await.unwrap();
    pool
}
