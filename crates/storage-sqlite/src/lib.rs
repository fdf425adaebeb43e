//! SQLite storage implementation for EventHub.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `eventhub-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for categories, events, tickets and wallets
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//! All other crates (`core`, `paychangu`) are database-agnostic and work with traits.
//!
//! ```text
//! core (domain)          paychangu (upstream)
//!       │                      │
//!       └──────────┬───────────┘
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod categories;
pub mod events;
pub mod tickets;
pub mod wallets;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use categories::CategoryRepository;
pub use events::EventRepository;
pub use tickets::TicketRepository;
pub use wallets::WalletRepository;

// Re-export from eventhub-core for convenience
pub use eventhub_core::errors::{DatabaseError, Error, Result};
