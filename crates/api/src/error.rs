//! HTTP error mapping.
//!
//! Every failure leaves the API as `{"error": ..., "details": ...}`. The
//! details string is the client-safe sentence from the engine or db crate,
//! never a raw server message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use db::{ConstraintKind, DbError};
use engine::EngineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("incident {0} not found")]
    IncidentNotFound(u64),
}

fn storage_status(err: &DbError) -> (StatusCode, &'static str) {
    match err {
        DbError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
        DbError::Constraint { kind: ConstraintKind::ForeignKey, .. } => {
            (StatusCode::BAD_REQUEST, "Invalid reference")
        }
        DbError::Constraint { kind: ConstraintKind::Unique, .. } => {
            (StatusCode::CONFLICT, "Already exists")
        }
        DbError::Constraint { .. } => (StatusCode::BAD_REQUEST, "Invalid value"),
        DbError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable"),
        DbError::Sqlx(_) | DbError::Migration(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            Self::Engine(EngineError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "Invalid incident payload", msg.clone())
            }
            Self::Engine(err @ EngineError::CreationFailed { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create incident",
                err.public_detail(),
            ),
            Self::Db(err) => {
                let (status, message) = storage_status(err);
                (status, message, err.public_detail().to_string())
            }
            Self::IncidentNotFound(_) => {
                (StatusCode::NOT_FOUND, "Incident not found", self.to_string())
            }
        };

        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        }

        (status, Json(json!({ "error": message, "details": details }))).into_response()
    }
}
