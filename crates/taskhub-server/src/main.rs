use taskhub_server::api::{self, AppState};
use taskhub_server::config::ServerConfig;
use taskhub_server::seed::seed_root_user;
use taskhub_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,taskhub_server=debug")),
        )
        .init();

    info!("Starting TaskHub API v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env()?;
    info!(?config, "Loaded configuration");
    if !config.remote_db.is_empty() {
        info!(
            host = ?config.remote_db.host,
            "DB_USER/DB_HOST/DB_PASSWORD/DB_PORT are ignored by the embedded store"
        );
    }

    // -----------------------------------------------------------------------
    // 3. Open the store and seed the first account
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.db_path)?;
    seed_root_user(&db, &config)?;

    let http_addr = config.http_addr;
    let state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
