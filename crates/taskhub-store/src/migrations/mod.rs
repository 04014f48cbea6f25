//! Schema migrations.
//!
//! Every [`Database::open_at`](crate::Database::open_at) and
//! [`Database::open_in_memory`](crate::Database::open_in_memory) call runs the
//! pending ones in order. The `user_version` pragma records how far a file has
//! been migrated.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Schema version this build expects.
pub const CURRENT_VERSION: u32 = 1;

/// Bring the schema of `conn` up to [`CURRENT_VERSION`].
///
/// A file written by a newer build is refused rather than silently used.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    tracing::debug!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking database migrations"
    );

    if current < 1 {
        tracing::info!("applying migration v001_initial");
        v001_initial::up(conn).map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}
