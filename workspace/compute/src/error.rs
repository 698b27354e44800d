use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

/// Errors raised by a [`Store`](crate::store::Store) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store runs in degraded read-only mode.
    #[error("Store is read-only")]
    ReadOnly,

    /// An insert collided with an existing business key.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// A delete was refused because other records still point at the row.
    #[error("{0} is still referenced")]
    Referenced(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => return StoreError::Duplicate(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return StoreError::Referenced(msg),
            _ => {}
        }
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
                let err = StoreError::Unavailable(err.to_string());
                error!(?err, "Database connection error");
                err
            }
            other => StoreError::Database(other),
        }
    }
}

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the store operations
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No entity with this business key in the session
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// An entity with this business key already exists in the session
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),

    /// Confirmation was refused by the status rules
    #[error("Cannot confirm {key}: {reason}")]
    ConfirmationRejected { key: String, reason: String },

    /// Quotation conversion was refused
    #[error("Cannot convert {key}: {reason}")]
    ConversionRejected { key: String, reason: String },

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The background save task did not finish normally
    #[error("Background task error: {0}")]
    Background(String),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;

/// Type alias for Result with StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;
