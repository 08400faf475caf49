//! The capability a type needs to be stored through [`Crud`](super::Crud).
//!
//! A [`Record`] names its table, declares its columns and knows how to turn its
//! create/update schema objects into bindable [`Value`]s. Rows are decoded with
//! `sqlx::FromRow` over the `Any` driver so one record definition works on both
//! SQLite and PostgreSQL.

use sqlx::any::AnyRow;
use sqlx::{Any, Decode, FromRow, Row, Type, ValueRef};
use uuid::Uuid;

use super::error::{CrudError, CrudResult};

/// Column names added by the timestamp mixin.
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// One column of a record's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub unique: bool,
    pub indexed: bool,
    pub nullable: bool,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type, primary_key: false, unique: false, indexed: false, nullable: false }
    }

    pub const fn primary_key(self) -> Self {
        Self { primary_key: true, ..self }
    }

    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }

    pub const fn indexed(self) -> Self {
        Self { indexed: true, ..self }
    }

    pub const fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }

    fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type);
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        def
    }
}

/// A scalar bound into a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        // Stored as lowercase hyphenated text on every backend
        Value::Text(v.hyphenated().to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A model mapped to one table.
///
/// Nullable columns must be read with [`decode_nullable`] in `FromRow`; the
/// `Any` driver rejects a plain `try_get::<Option<T>>` on a NULL value.
///
/// `Create` is the schema object used by `create`/`create_many`; every field it
/// returns from [`insert_values`](Record::insert_values) is written. `Update` is
/// the partial-update schema; [`update_values`](Record::update_values) must
/// only return the fields the caller explicitly set.
pub trait Record: for<'r> FromRow<'r, AnyRow> + Send + Unpin + 'static {
    type Create: Send + Sync;
    type Update: Send + Sync;

    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [Column];
    /// Adds server-maintained `created_at` / `updated_at` columns.
    const TIMESTAMPS: bool = false;

    fn insert_values(data: &Self::Create) -> Vec<(&'static str, Value)>;

    fn update_values(data: &Self::Update) -> Vec<(&'static str, Value)>;
}

/// Every column name the record exposes, mixin columns included.
pub fn column_names<M: Record>() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = M::COLUMNS.iter().map(|c| c.name).collect();
    if M::TIMESTAMPS {
        names.extend([CREATED_AT, UPDATED_AT]);
    }
    names
}

/// Maps a caller-supplied column name onto the record's whitelist.
///
/// `None` selects the primary key.
pub fn resolve_column<M: Record>(column: Option<&str>) -> CrudResult<&'static str> {
    let wanted = column.unwrap_or(M::PRIMARY_KEY);
    column_names::<M>()
        .into_iter()
        .find(|name| *name == wanted)
        .ok_or_else(|| CrudError::InvalidColumn { table: M::TABLE, column: wanted.to_string() })
}

fn timestamp_columns() -> [Column; 2] {
    [
        Column::new(CREATED_AT, "TEXT"),
        Column::new(UPDATED_AT, "TEXT").nullable().indexed(),
    ]
}

pub fn create_table_sql<M: Record>() -> String {
    let mut defs: Vec<String> = M::COLUMNS.iter().map(Column::definition).collect();
    if M::TIMESTAMPS {
        defs.push(format!("{} TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP", CREATED_AT));
        defs.push(format!("{} TEXT NULL DEFAULT CURRENT_TIMESTAMP", UPDATED_AT));
    }
    format!("CREATE TABLE IF NOT EXISTS {} ({})", M::TABLE, defs.join(", "))
}

pub fn create_index_sql<M: Record>() -> Vec<String> {
    let mixin = if M::TIMESTAMPS { timestamp_columns().to_vec() } else { Vec::new() };
    M::COLUMNS
        .iter()
        .chain(mixin.iter())
        .filter(|c| c.indexed || c.unique)
        .map(|c| {
            format!(
                "CREATE {}INDEX IF NOT EXISTS ix_{}_{} ON {} ({})",
                if c.unique { "UNIQUE " } else { "" },
                M::TABLE,
                c.name,
                M::TABLE,
                c.name
            )
        })
        .collect()
}

pub fn drop_table_sql<M: Record>() -> String {
    format!("DROP TABLE IF EXISTS {}", M::TABLE)
}

/// Reads a text column holding a UUID.
pub fn decode_uuid(row: &AnyRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Reads a nullable column, mapping SQL NULL to `None`.
pub fn decode_nullable<T>(row: &AnyRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: for<'r> Decode<'r, Any> + Type<Any>,
{
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    row.try_get(column).map(Some)
}
