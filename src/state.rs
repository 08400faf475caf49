use sqlx::AnyPool;

/// The shared application state.
///
/// Cloned into every handler by axum; the pool is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool. Handlers check connections out through
    /// [`DbSession`](crate::db::DbSession) rather than using it directly.
    pub db: AnyPool,
}

impl AppState {
    pub fn new(db: AnyPool) -> Self {
        Self { db }
    }
}
