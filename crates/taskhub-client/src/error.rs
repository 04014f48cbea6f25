use taskhub_shared::ValidationErrors;
use thiserror::Error;

/// Every way a client operation can fail.
///
/// `Conflict`, `NotFound` and `Server` are answers from the service; the rest
/// never reached it or never left the device.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// The service refused one field, e.g. an email already in use.
    #[error("{field}: {error}")]
    Conflict { field: String, error: String },

    #[error("Not found")]
    NotFound,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The request never completed: connect, timeout, DNS or a body that
    /// could not be decoded.
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Conflict { .. } | ClientError::NotFound | ClientError::Server { .. }
        )
    }

    /// The offending field of a `Conflict`.
    pub fn conflict_field(&self) -> Option<&str> {
        match self {
            ClientError::Conflict { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<rusqlite::Error> for ClientError {
    fn from(err: rusqlite::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let conflict = ClientError::Conflict {
            field: "email".into(),
            error: "Email already exists".into(),
        };
        assert!(conflict.is_service_failure());
        assert_eq!(conflict.conflict_field(), Some("email"));
        assert_eq!(conflict.to_string(), "email: Email already exists");

        assert!(!ClientError::Transport("refused".into()).is_service_failure());
        assert!(!ClientError::Validation(ValidationErrors::single("name", "empty")).is_service_failure());
    }
}
