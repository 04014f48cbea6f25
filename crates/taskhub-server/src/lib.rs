//! # taskhub-server
//!
//! REST API of TaskHub: projects, categories, users, tasks and per-task chat
//! over the SQLite store, behind HS256 bearer tokens.
//!
//! The binary in `main.rs` wires configuration and logging around
//! [`api::serve`]; tests and embedders build the router directly.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod seed;

pub use api::{build_router, serve, serve_on, AppState};
pub use config::ServerConfig;
pub use error::ServerError;
