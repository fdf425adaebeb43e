/// Currency used for wallets when none is specified.
pub const DEFAULT_CURRENCY: &str = "MWK";

/// Prefix for payment-gateway correlation references generated by the ledger.
pub const TX_REF_PREFIX: &str = "EH";

/// Number of events requested from the catalog listing in one sync call.
pub const DEFAULT_CATALOG_PAGE_SIZE: u32 = 100;

/// Paging bounds for local event queries.
pub const DEFAULT_EVENTS_MIN_LIMIT: i64 = 1;
pub const DEFAULT_EVENTS_MAX_LIMIT: i64 = 100;
pub const DEFAULT_EVENTS_LIMIT: i64 = 20;

/// Paging bounds for transaction history queries.
pub const DEFAULT_TRANSACTIONS_LIMIT: i64 = 20;
pub const MAX_TRANSACTIONS_LIMIT: i64 = 100;
