//! Utility functions for SQLite storage operations.
//!
//! This module provides helpers for working with SQLite, including chunking
//! utilities to avoid parameter limits and the TEXT encoding used for money.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use eventhub_core::errors::{DatabaseError, Error, Result};

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite has a compile-time limit on the number of parameters in a SQL statement,
/// typically around 999 (SQLITE_MAX_VARIABLE_NUMBER). To stay safely under this limit
/// and leave room for other parameters in the query, we use 500 as our chunk size.
///
/// Any query that uses `IN (...)` with a potentially large list of IDs should use
/// `chunk_for_sqlite` to split the list into manageable chunks.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite queries.
///
/// This function splits a slice into chunks of size `SQLITE_MAX_PARAMS_CHUNK` (500),
/// which can be used to safely execute multiple queries with `IN (...)` clauses
/// without exceeding SQLite's parameter limits.
///
/// # Example
///
/// ```ignore
/// let event_ids: Vec<String> = orphaned_event_ids(); // Could be > 999 items
///
/// let mut all_results = Vec::new();
/// for chunk in chunk_for_sqlite(&event_ids) {
///     let results = query_with_in_clause(chunk)?;
///     all_results.extend(results);
/// }
/// ```
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Money columns are stored as TEXT so no precision is lost to REAL.
pub fn decimal_to_db(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Parses a ledger money column (balances, amounts, goal progress).
///
/// A value that does not parse is a corrupt row, so it fails instead of
/// being read as zero and written back by the next posting.
pub fn parse_ledger_decimal(value_str: &str, field_name: &str) -> Result<Decimal> {
    Decimal::from_str(value_str.trim())
        .or_else(|_| Decimal::from_scientific(value_str.trim()))
        .map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Corrupt {} '{}': {}",
                field_name, value_str, e
            )))
        })
}

/// Parses an informational money column, with a fallback for scientific
/// notation by parsing as f64 first. Unparseable values are logged and read
/// as zero.
pub fn parse_decimal_tolerant(value_str: &str, field_name: &str) -> Decimal {
    match Decimal::from_str(value_str) {
        Ok(d) => d,
        Err(e_decimal) => match f64::from_str(value_str).ok().and_then(Decimal::from_f64) {
            Some(d) => d,
            None => {
                log::error!(
                    "Failed to parse {} '{}' as Decimal (err: {}). Falling back to ZERO.",
                    field_name,
                    value_str,
                    e_decimal
                );
                Decimal::ZERO
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_text_encoding() {
        assert_eq!(decimal_to_db(dec!(1500.00)), "1500");
        assert_eq!(decimal_to_db(dec!(0.10)), "0.1");
        assert_eq!(parse_decimal_tolerant("250.75", "amount"), dec!(250.75));
        assert_eq!(parse_decimal_tolerant("1e3", "amount"), dec!(1000));
        assert_eq!(parse_decimal_tolerant("garbage", "amount"), Decimal::ZERO);
    }

    #[test]
    fn test_ledger_decimal_rejects_corrupt_text() {
        assert_eq!(parse_ledger_decimal("1500", "regular_balance").unwrap(), dec!(1500));
        assert_eq!(parse_ledger_decimal("1e3", "amount").unwrap(), dec!(1000));
        let err = parse_ledger_decimal("12,50", "regular_balance").unwrap_err();
        assert!(matches!(err, Error::Database(DatabaseError::Internal(_))));
        assert!(err.to_string().contains("regular_balance"));
    }

    #[test]
    fn test_chunk_for_sqlite_over_limit() {
        let items: Vec<i32> = (0..1200).collect();
        let chunks: Vec<_> = chunk_for_sqlite(&items).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), SQLITE_MAX_PARAMS_CHUNK);
        assert_eq!(chunks[2].len(), 200);
    }
}
