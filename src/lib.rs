//! # crudkit
//!
//! A small backend scaffold: an HTTP server with a liveness endpoint, an admin
//! panel for the `User` model, and a generic CRUD repository that every model
//! shares.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server and routing
//! - **SQLx**: asynchronous database access through the `Any` driver
//!   (SQLite by default, PostgreSQL when `DB_HOST` is configured)
//! - **Tokio**: async runtime
//! - **Serde**: (de)serialization of schema objects and JSON responses
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration and connection string derivation
//! - [`crud`]: the generic repository ([`crud::Crud`]) and the [`crud::Record`] capability
//! - [`db`]: pool construction, schema creation and the per-request session
//! - [`error`]: HTTP error responses
//! - [`models`]: the `User` record and its schema objects
//! - [`routes`]: `/ping` and the admin panel
//! - [`state`]: shared application state

pub mod config;
pub mod crud;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

#[cfg(test)]
mod tests;
