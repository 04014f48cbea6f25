//! Server configuration loaded from environment variables.
//!
//! Everything but `JWT_SECRET` has a default so a local instance starts with a
//! single variable set.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use taskhub_shared::constants::{DEFAULT_HTTP_PORT, TOKEN_TTL_DAYS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Connection settings for a networked database.
///
/// The embedded store ignores them; they are kept so deployments that export
/// the full set of variables keep working and are told so in the log.
#[derive(Clone, Default)]
pub struct RemoteDbSettings {
    pub user: Option<String>,
    pub host: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
}

impl RemoteDbSettings {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.host.is_none() && self.password.is_none() && self.port.is_none()
    }
}

impl fmt::Debug for RemoteDbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDbSettings")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("port", &self.port)
            .finish()
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `PORT` (the host is always `0.0.0.0`)
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DB_NAME`
    /// Default: `taskhub.db`
    pub db_path: PathBuf,

    /// HS256 signing secret for bearer tokens.
    /// Env: `JWT_SECRET` (required)
    pub jwt_secret: String,

    /// Lifetime of an issued token, in days.
    pub token_ttl_days: i64,

    /// Env: `DB_USER`, `DB_HOST`, `DB_PASSWORD`, `DB_PORT`
    pub remote_db: RemoteDbSettings,

    /// First root account, created only when the user table is empty.
    /// Env: `ROOT_EMAIL`, `ROOT_PASSWORD`
    pub root_email: Option<String>,
    pub root_password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            db_path: PathBuf::from("taskhub.db"),
            jwt_secret: String::new(),
            token_ttl_days: TOKEN_TTL_DAYS,
            remote_db: RemoteDbSettings::default(),
            root_email: None,
            root_password: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("db_path", &self.db_path)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_days", &self.token_ttl_days)
            .field("remote_db", &self.remote_db)
            .field("root_email", &self.root_email)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => config.http_addr.set_port(port),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, using default"),
            }
        }

        if let Some(path) = get("DB_NAME") {
            config.db_path = PathBuf::from(path);
        }

        config.jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        config.remote_db = RemoteDbSettings {
            user: get("DB_USER"),
            host: get("DB_HOST"),
            password: get("DB_PASSWORD"),
            port: get("DB_PORT").and_then(|p| match p.trim().parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!(value = %p, "Invalid DB_PORT, ignoring");
                    None
                }
            }),
        };

        config.root_email = get("ROOT_EMAIL");
        config.root_password = get("ROOT_PASSWORD");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr.port(), 5000);
        assert_eq!(config.token_ttl_days, 30);
    }

    #[test]
    fn test_jwt_secret_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(load(&[("JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "8088"),
            ("DB_NAME", "/tmp/projects.db"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "not-a-port"),
        ])
        .unwrap();
        assert_eq!(config.http_addr.port(), 8088);
        assert_eq!(config.db_path, PathBuf::from("/tmp/projects.db"));
        assert_eq!(config.remote_db.host.as_deref(), Some("db.internal"));
        assert_eq!(config.remote_db.port, None);
        assert!(!config.remote_db.is_empty());
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = load(&[("JWT_SECRET", "x"), ("PORT", "abc")]).unwrap();
        assert_eq!(config.http_addr.port(), 5000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("JWT_SECRET", "topsecret"), ("DB_PASSWORD", "hunter2")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("topsecret"));
        assert!(!rendered.contains("hunter2"));
    }
}
