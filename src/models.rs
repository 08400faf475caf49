//! Domain records and their schema objects.

use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::crud::record::decode_uuid;
use crate::crud::{Column, Crud, Record, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
}

/// Input for creating a user. `id` falls back to a fresh UUIDv7.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCreate {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
}

impl UserCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into() }
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
}

impl<'r> FromRow<'r, AnyRow> for User {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self { id: decode_uuid(row, "id")?, name: row.try_get("name")? })
    }
}

impl Record for User {
    type Create = UserCreate;
    type Update = UserUpdate;

    const TABLE: &'static str = "users";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", "TEXT").primary_key().unique(),
        Column::new("name", "TEXT"),
    ];

    fn insert_values(data: &UserCreate) -> Vec<(&'static str, Value)> {
        vec![
            ("id", data.id.unwrap_or_else(Uuid::now_v7).into()),
            ("name", data.name.as_str().into()),
        ]
    }

    fn update_values(data: &UserUpdate) -> Vec<(&'static str, Value)> {
        let mut values = Vec::new();
        if let Some(name) = &data.name {
            values.push(("name", name.into()));
        }
        values
    }
}

pub type UserCrud = Crud<User>;
