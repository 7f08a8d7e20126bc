//! Typed error type for the db crate.

use thiserror::Error;

/// Which storage-level constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    ForeignKey,
    Unique,
    NotNull,
    Check,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignKey => write!(f, "foreign key"),
            Self::Unique     => write!(f, "unique"),
            Self::NotNull    => write!(f, "not null"),
            Self::Check      => write!(f, "check"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(sqlx::Error),

    #[error("row not found")]
    NotFound,

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The server rejected a statement because it violates a constraint.
    ///
    /// `message` is the server's own text and may name tables or columns;
    /// it is meant for logs only.
    #[error("{kind} constraint violated: {message}")]
    Constraint {
        kind: ConstraintKind,
        message: String,
    },

    /// The connection or the pool could not serve the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl DbError {
    /// A fixed, client-safe sentence describing the failure category.
    ///
    /// Never contains SQL text, server messages, or connection details.
    pub fn public_detail(&self) -> &'static str {
        match self {
            Self::NotFound => "The requested record does not exist.",
            Self::Constraint { kind: ConstraintKind::ForeignKey, .. } => {
                "A referenced user or incident does not exist."
            }
            Self::Constraint { kind: ConstraintKind::Unique, .. } => {
                "The record already exists."
            }
            Self::Constraint { .. } => "A required value was missing or out of range.",
            Self::Unavailable(_) => "The database is currently unavailable.",
            Self::Sqlx(_) | Self::Migration(_) => "An unexpected storage error occurred.",
        }
    }

    /// `true` for constraint violations of the given kind.
    pub fn is_constraint(&self, wanted: ConstraintKind) -> bool {
        matches!(self, Self::Constraint { kind, .. } if *kind == wanted)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db_err) => {
                let kind = match db_err.kind() {
                    sqlx::error::ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                    sqlx::error::ErrorKind::UniqueViolation     => Some(ConstraintKind::Unique),
                    sqlx::error::ErrorKind::NotNullViolation    => Some(ConstraintKind::NotNull),
                    sqlx::error::ErrorKind::CheckViolation      => Some(ConstraintKind::Check),
                    _ => None,
                };
                match kind {
                    Some(kind) => Self::Constraint {
                        kind,
                        message: db_err.message().to_string(),
                    },
                    None => Self::Sqlx(sqlx::Error::Database(db_err)),
                }
            }
            sqlx::Error::Io(io) => Self::Unavailable(io.to_string()),
            sqlx::Error::PoolTimedOut => Self::Unavailable("connection pool timed out".into()),
            sqlx::Error::PoolClosed => Self::Unavailable("connection pool closed".into()),
            sqlx::Error::WorkerCrashed => Self::Unavailable("connection worker crashed".into()),
            other => Self::Sqlx(other),
        }
    }
}
