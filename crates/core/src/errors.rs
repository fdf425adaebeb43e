//! Core error types for the EventHub backend.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer,
//! and HTTP failures from the PayChangu client are converted to [`UpstreamError`].

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

use crate::tickets::TicketError;
use crate::wallets::WalletError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the backend.
///
/// Database-specific errors are wrapped in string form to keep this type
/// database-agnostic.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Wallet(#[from] WalletError),

    #[error("{0}")]
    Ticket(#[from] TicketError),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns true when the error means the requested record does not exist,
    /// whether reported by the service layer or by the storage layer.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::Database(DatabaseError::NotFound(_))
                | Error::Upstream(UpstreamError::NotFound(_))
        )
    }
}

/// Database-agnostic error type for storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

/// Failures talking to the external catalog / payment provider.
///
/// The variants are structured so callers can react to specific upstream
/// conditions without matching on message text.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{0} not found upstream")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Ticket has already been redeemed")]
    AlreadyRedeemed,

    #[error("Ticket has not been redeemed")]
    NotRedeemed,
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
