//! Engine-level error types.

use std::time::Duration;

use thiserror::Error;

use db::DbError;

/// Why an incident creation was rolled back.
#[derive(Debug, Error)]
pub enum CreationCause {
    /// A storage operation inside the transaction failed.
    #[error("{0}")]
    Storage(#[source] DbError),

    /// The transaction did not finish within the configured bound.
    #[error("transaction did not finish within {0:?}")]
    Timeout(Duration),
}

/// Errors produced by the incident engine.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Caller errors ------

    /// The payload is missing required fields or carries invalid values.
    /// Raised before any transaction begins.
    #[error("invalid incident payload: {0}")]
    Validation(String),

    // ------ Workflow errors ------

    /// The creation transaction was rolled back (or never committed).
    #[error("incident creation failed: {cause}")]
    CreationFailed {
        #[source]
        cause: CreationCause,
    },
}

impl EngineError {
    pub(crate) fn storage(err: DbError) -> Self {
        Self::CreationFailed { cause: CreationCause::Storage(err) }
    }

    pub(crate) fn timeout(limit: Duration) -> Self {
        Self::CreationFailed { cause: CreationCause::Timeout(limit) }
    }

    /// Client-safe detail string for this error.
    ///
    /// Validation messages describe the caller's own input and pass through;
    /// storage failures are reduced to a fixed sentence per category.
    pub fn public_detail(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::CreationFailed { cause: CreationCause::Storage(err) } => {
                err.public_detail().to_string()
            }
            Self::CreationFailed { cause: CreationCause::Timeout(_) } => {
                "The database did not respond in time.".to_string()
            }
        }
    }
}
