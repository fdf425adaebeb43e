//! Storage-specific error types for SQLite operations.
//!
//! This module provides error types that wrap Diesel-specific errors and convert
//! them to the database-agnostic error types defined in `eventhub_core`.

use diesel::result::Error as DieselError;
use eventhub_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
///
/// These errors are internal to the storage layer and are converted to
/// `eventhub_core::Error` before being returned to callers.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Core error: {0}")]
    CoreError(String),

    /// A domain error raised inside a write job. Kept intact so callers can
    /// still match on wallet and validation failures after the rollback.
    #[error("{0}")]
    Domain(Error),
}

/// Convert core Error to StorageError (for write_actor transaction wrapper)
impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        StorageError::Domain(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            StorageError::QueryFailed(DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::QueryFailed(DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => Error::Database(DatabaseError::ForeignKeyViolation(
                info.message().to_string(),
            )),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::CoreError(e) => Error::Database(DatabaseError::Internal(e)),
            StorageError::Domain(e) => e,
        }
    }
}

/// Extension trait for easily converting Diesel Results to core Results.
///
/// This provides a `.into_core()` method on any `Result<T, diesel::result::Error>`
/// which handles the conversion through StorageError.
pub trait IntoCore<T> {
    fn into_core(self) -> eventhub_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> eventhub_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> eventhub_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_core::wallets::WalletError;

    #[test]
    fn test_domain_errors_survive_the_transaction_wrapper() {
        let storage: StorageError = Error::Wallet(WalletError::SelfTransfer).into();
        let core: Error = storage.into();
        assert!(matches!(core, Error::Wallet(WalletError::SelfTransfer)));
    }

    #[test]
    fn test_not_found_maps_to_database_not_found() {
        let core: Error = StorageError::QueryFailed(DieselError::NotFound).into();
        assert!(core.is_not_found());
    }
}
