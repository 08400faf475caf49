use thiserror::Error;

/// Errors surfaced by [`Crud`](super::Crud).
///
/// A missing row on a single-record read is not an error; those operations
/// return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CrudError {
    /// A write violated a uniqueness, not-null, foreign-key or check constraint.
    #[error("{context} conflicts with existing data: {source}")]
    IntegrityConflict {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    /// The requested filter column does not exist on the record type.
    #[error("column {column} not found on {table}")]
    InvalidColumn { table: &'static str, column: String },
    /// Anything else that went wrong while talking to the store.
    #[error("unknown error occurred: {message}")]
    Failure {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },
}

pub type CrudResult<T> = Result<T, CrudError>;

impl CrudError {
    pub(crate) fn failure(message: impl Into<String>) -> Self {
        CrudError::Failure { message: message.into(), source: None }
    }

    /// Classifies a driver error raised by a write.
    pub(crate) fn from_write(context: impl Into<String>, err: sqlx::Error) -> Self {
        if is_integrity_violation(&err) {
            let context = context.into();
            tracing::warn!("{} rejected by a constraint: {}", context, err);
            CrudError::IntegrityConflict { context, source: err }
        } else {
            Self::from(err)
        }
    }
}

impl From<sqlx::Error> for CrudError {
    fn from(err: sqlx::Error) -> Self {
        CrudError::Failure { message: err.to_string(), source: Some(err) }
    }
}

/// True for constraint violations on either backend.
///
/// SQLite reports `SQLITE_CONSTRAINT` (19) in the low byte of its extended
/// result codes; PostgreSQL uses SQLSTATE class 23.
pub fn is_integrity_violation(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    if !matches!(db_err.kind(), sqlx::error::ErrorKind::Other) {
        return true;
    }
    match db_err.code() {
        Some(code) if is_sqlstate(&code) => code.starts_with("23"),
        Some(code) => code.parse::<i32>().map(|c| c & 0xff == 19).unwrap_or(false),
        None => false,
    }
}

/// PostgreSQL SQLSTATEs are exactly five alphanumeric characters.
fn is_sqlstate(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
