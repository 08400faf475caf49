//! Generic CRUD repository.
//!
//! [`Crud<M>`] provides the same operation set for every [`Record`] type: a
//! create (single and batch), reads by id / id list / value, a partial update
//! and deletes. Filter columns are given by name and checked against the
//! record's column whitelist before any SQL is built.
//!
//! Every operation takes the caller's connection so that the request-scoped
//! session decides the connection lifetime, not the repository.

mod error;
pub mod record;

use std::marker::PhantomData;

use sqlx::any::AnyArguments;
use sqlx::query::{Query, QueryAs};
use sqlx::{Any, AnyConnection, Connection};

pub use error::{is_integrity_violation, CrudError, CrudResult};
pub use record::{Column, Record, Value};

use record::{resolve_column, UPDATED_AT};

/// Result of [`Crud::create_many`].
#[derive(Debug)]
pub enum CreateMany<M> {
    /// The batch was committed; models were not requested.
    Inserted,
    /// The committed models, in input order.
    Models(Vec<M>),
}

/// Repository over one record type.
///
/// Holds no state; alias it per model (`type UserCrud = Crud<User>`).
pub struct Crud<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Record> Crud<M> {
    /// Inserts one row built from every field of `data` and returns it as stored.
    pub async fn create(conn: &mut AnyConnection, data: &M::Create) -> CrudResult<M> {
        let (sql, values) = insert_statement::<M>(data, true);
        tracing::debug!(table = M::TABLE, "create");
        bind_as(sqlx::query_as::<Any, M>(&sql), values)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| CrudError::from_write(M::TABLE, e))
    }

    /// Inserts a batch inside one transaction.
    ///
    /// Either every row is committed or none is.
    pub async fn create_many(
        conn: &mut AnyConnection,
        data: &[M::Create],
        return_models: bool,
    ) -> CrudResult<CreateMany<M>> {
        tracing::debug!(table = M::TABLE, count = data.len(), "create_many");
        let mut tx = conn.begin().await?;
        let mut models = Vec::with_capacity(if return_models { data.len() } else { 0 });

        for item in data {
            let (sql, values) = insert_statement::<M>(item, return_models);
            if return_models {
                let model = bind_as(sqlx::query_as::<Any, M>(&sql), values)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| CrudError::from_write(M::TABLE, e))?;
                models.push(model);
            } else {
                bind(sqlx::query(&sql), values)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| CrudError::from_write(M::TABLE, e))?;
            }
        }

        tx.commit().await.map_err(|e| CrudError::from_write(M::TABLE, e))?;

        Ok(if return_models { CreateMany::Models(models) } else { CreateMany::Inserted })
    }

    /// Looks up the single row whose `column` (primary key by default) equals `id`.
    pub async fn get_one_by_id(
        conn: &mut AnyConnection,
        id: impl Into<Value>,
        column: Option<&str>,
    ) -> CrudResult<Option<M>> {
        let column = resolve_column::<M>(column)?;
        let sql = format!("SELECT * FROM {} WHERE {} = $1 LIMIT 2", M::TABLE, column);
        let mut rows = bind_as(sqlx::query_as::<Any, M>(&sql), vec![id.into()])
            .fetch_all(&mut *conn)
            .await?;

        if rows.len() > 1 {
            return Err(CrudError::failure(format!(
                "multiple {} rows found for {}",
                M::TABLE,
                column
            )));
        }
        Ok(rows.pop())
    }

    /// Returns rows whose `column` is in `ids`.
    ///
    /// An empty `ids` applies no filter and returns every row.
    pub async fn get_many_by_ids<V: Into<Value>>(
        conn: &mut AnyConnection,
        ids: impl IntoIterator<Item = V>,
        column: Option<&str>,
    ) -> CrudResult<Vec<M>> {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Self::get_all(conn).await;
        }
        let column = resolve_column::<M>(column)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} IN ({}) ORDER BY {}",
            M::TABLE,
            column,
            placeholders(1, ids.len()),
            M::PRIMARY_KEY
        );
        Ok(bind_as(sqlx::query_as::<Any, M>(&sql), ids).fetch_all(&mut *conn).await?)
    }

    /// Returns rows where `column` equals `value`.
    pub async fn get_many_by_value(
        conn: &mut AnyConnection,
        value: impl Into<Value>,
        column: &str,
    ) -> CrudResult<Vec<M>> {
        let column = resolve_column::<M>(Some(column))?;
        let sql = format!("SELECT * FROM {} WHERE {} = $1 ORDER BY {}", M::TABLE, column, M::PRIMARY_KEY);
        Ok(bind_as(sqlx::query_as::<Any, M>(&sql), vec![value.into()])
            .fetch_all(&mut *conn)
            .await?)
    }

    pub async fn get_all(conn: &mut AnyConnection) -> CrudResult<Vec<M>> {
        let sql = format!("SELECT * FROM {} ORDER BY {}", M::TABLE, M::PRIMARY_KEY);
        Ok(sqlx::query_as::<Any, M>(&sql).fetch_all(&mut *conn).await?)
    }

    /// Writes only the fields set in `data` to the rows matching `column = id`.
    ///
    /// Returns the affected rows after the update. An empty patch writes nothing.
    pub async fn update_by_id(
        conn: &mut AnyConnection,
        data: &M::Update,
        id: impl Into<Value>,
        column: Option<&str>,
    ) -> CrudResult<Vec<M>> {
        let column = resolve_column::<M>(column)?;
        let id = id.into();
        let changes = M::update_values(data);
        if changes.is_empty() {
            tracing::debug!(table = M::TABLE, "update_by_id with empty patch, nothing to write");
            return Self::get_many_by_value(conn, id, column).await;
        }

        let mut assignments: Vec<String> = changes
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ${}", name, i + 1))
            .collect();
        if M::TIMESTAMPS {
            assignments.push(format!("{} = CURRENT_TIMESTAMP", UPDATED_AT));
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING *",
            M::TABLE,
            assignments.join(", "),
            column,
            changes.len() + 1
        );

        let context = format!("{} {}={}", M::TABLE, column, display_value(&id));
        let mut values: Vec<Value> = changes.into_iter().map(|(_, v)| v).collect();
        values.push(id);

        tracing::debug!(table = M::TABLE, column, "update_by_id");
        bind_as(sqlx::query_as::<Any, M>(&sql), values)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| CrudError::from_write(context, e))
    }

    /// Deletes rows matching `column = id` and returns how many went away.
    pub async fn remove_by_id(
        conn: &mut AnyConnection,
        id: impl Into<Value>,
        column: Option<&str>,
    ) -> CrudResult<u64> {
        let column = resolve_column::<M>(column)?;
        let sql = format!("DELETE FROM {} WHERE {} = $1", M::TABLE, column);
        tracing::debug!(table = M::TABLE, column, "remove_by_id");
        let result = bind(sqlx::query(&sql), vec![id.into()])
            .execute(&mut *conn)
            .await
            .map_err(|e| CrudError::from_write(M::TABLE, e))?;
        Ok(result.rows_affected())
    }

    /// Deletes rows whose `column` is in `ids`.
    ///
    /// Unlike [`get_many_by_ids`](Self::get_many_by_ids), an empty list is an
    /// error rather than "everything".
    pub async fn remove_many_by_ids<V: Into<Value>>(
        conn: &mut AnyConnection,
        ids: impl IntoIterator<Item = V>,
        column: Option<&str>,
    ) -> CrudResult<u64> {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(CrudError::failure("No ids provided."));
        }
        let column = resolve_column::<M>(column)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            M::TABLE,
            column,
            placeholders(1, ids.len())
        );
        tracing::debug!(table = M::TABLE, column, count = ids.len(), "remove_many_by_ids");
        let result = bind(sqlx::query(&sql), ids)
            .execute(&mut *conn)
            .await
            .map_err(|e| CrudError::from_write(M::TABLE, e))?;
        Ok(result.rows_affected())
    }
}

fn insert_statement<M: Record>(data: &M::Create, returning: bool) -> (String, Vec<Value>) {
    let (columns, values): (Vec<&str>, Vec<Value>) = M::insert_values(data).into_iter().unzip();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}){}",
        M::TABLE,
        columns.join(", "),
        placeholders(1, values.len()),
        if returning { " RETURNING *" } else { "" }
    );
    (sql, values)
}

/// `$n` placeholders; SQLx's SQLite driver accepts the PostgreSQL form too.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count).map(|i| format!("${}", i)).collect::<Vec<_>>().join(", ")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
    }
}

fn bind_as<'q, O>(
    mut query: QueryAs<'q, Any, O, AnyArguments<'q>>,
    values: Vec<Value>,
) -> QueryAs<'q, Any, O, AnyArguments<'q>> {
    for value in values {
        query = match value {
            Value::Text(s) => query.bind(s),
            Value::Int(i) => query.bind(i),
            Value::Bool(b) => query.bind(b),
            Value::Null => query.bind(None::<String>),
        };
    }
    query
}

fn bind<'q>(mut query: Query<'q, Any, AnyArguments<'q>>, values: Vec<Value>) -> Query<'q, Any, AnyArguments<'q>> {
    for value in values {
        query = match value {
            Value::Text(s) => query.bind(s),
            Value::Int(i) => query.bind(i),
            Value::Bool(b) => query.bind(b),
            Value::Null => query.bind(None::<String>),
        };
    }
    query
}
