use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use taskhub_shared::protocol::{AckBody, FieldErrorBody, MessageBody};
use taskhub_shared::ValidationErrors;
use taskhub_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    /// A single field was rejected, e.g. an email already in use.
    #[error("{field}: {error}")]
    Conflict { field: String, error: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn conflict(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Conflict {
            field: field.into(),
            error: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a caller. Internal details stay in the log.
    fn public_message(&self) -> String {
        match self {
            ServerError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServerError::NotFound("Record not found".into()),
            StoreError::Constraint(detail) => {
                tracing::debug!(%detail, "store constraint rejected write");
                ServerError::BadRequest("The request references missing or duplicate records".into())
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = errors.fields();
        match (fields.next(), fields.next()) {
            (Some((field, error)), None) => ServerError::conflict(field, error),
            _ => ServerError::BadRequest(errors.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ServerError::Internal(detail) = &self {
            tracing::error!(%detail, "request failed");
        }

        match self {
            ServerError::Conflict { field, error } => {
                (status, Json(FieldErrorBody { field, error })).into_response()
            }
            other => (
                status,
                Json(MessageBody {
                    message: other.public_message(),
                }),
            )
                .into_response(),
        }
    }
}

/// Failure of an endpoint that answers `{success: false, message}`.
#[derive(Debug)]
pub struct AckFailure(pub ServerError);

impl From<ServerError> for AckFailure {
    fn from(err: ServerError) -> Self {
        AckFailure(err)
    }
}

impl From<StoreError> for AckFailure {
    fn from(err: StoreError) -> Self {
        AckFailure(err.into())
    }
}

impl From<ValidationErrors> for AckFailure {
    fn from(errors: ValidationErrors) -> Self {
        AckFailure(errors.into())
    }
}

impl IntoResponse for AckFailure {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if let ServerError::Internal(detail) = &self.0 {
            tracing::error!(%detail, "request failed");
        }
        let message = match self.0 {
            ServerError::Conflict { error, .. } => error,
            other => other.public_message(),
        };
        (
            status,
            Json(AckBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}
