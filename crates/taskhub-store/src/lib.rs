//! # taskhub-store
//!
//! Relational storage behind the TaskHub API, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every resource
//! the API serves. Ids and timestamps are assigned here, never by callers.

pub mod categories;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod projects;
pub mod tasks;
pub mod users;

mod error;
#[cfg(test)]
mod test_support;

pub use database::Database;
pub use error::StoreError;
pub use users::UserCredentials;
