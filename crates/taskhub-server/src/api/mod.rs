//! HTTP routes of the TaskHub API.
//!
//! Every route but `/health` and `/login` needs a bearer token; the
//! [`AuthUser`](crate::auth::AuthUser) extractor enforces it per handler.

mod messages;
mod projects;
mod session;
mod tasks;
mod users;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use taskhub_store::Database;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::TokenKeys;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub tokens: Arc<TokenKeys>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            tokens: Arc::new(TokenKeys::from_secret(&config.jwt_secret, config.token_ttl_days)),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Auth
        .route("/login", post(session::login))
        .route("/change-password", post(session::change_password))
        // Projects & categories
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/:id",
            get(projects::get_one)
                .put(projects::replace)
                .delete(projects::remove),
        )
        .route("/categories", get(projects::list_categories).post(projects::create_category))
        // Users
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", patch(users::update).delete(users::remove))
        // Tasks
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route("/tasks/project/:id", get(tasks::list_for_project))
        .route("/tasks/:id", patch(tasks::update).delete(tasks::remove))
        // Messages
        .route("/messages/:task_id", get(messages::history))
        .route("/api/messages", post(messages::send))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!(addr = %addr, "Starting HTTP API server");

    let listener = TcpListener::bind(addr).await?;
    serve_on(state, listener).await
}

/// Serve on an already bound listener (tests bind port 0 first).
pub async fn serve_on(state: AppState, listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
