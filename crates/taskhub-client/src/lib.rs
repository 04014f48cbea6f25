//! Client-side cache and consistency layer for the TaskHub service.
//!
//! Screens read from in-memory caches and write through the typed API
//! client; a cache only changes after the service confirmed the write.

pub mod cache;
pub mod config;
pub mod error;
pub mod focus;
pub mod messages;
pub mod projects;
pub mod remote;
pub mod session;
pub mod state;
pub mod tasks;
pub mod users;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::ClientError;
pub use remote::ApiClient;
pub use session::{Session, SessionState, SessionStore};
pub use state::{AppState, Startup};

/// Install the log subscriber. `RUST_LOG` overrides the default filter.
/// Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("taskhub_client=debug,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
