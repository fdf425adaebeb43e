//! EventHub Core - Domain entities, services, and traits.
//!
//! This crate contains the business logic for the events/ticketing/wallet
//! backend. It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate (persistence) and the `paychangu` crate
//! (external catalog and payment gateway).

pub mod catalog;
pub mod categories;
pub mod constants;
pub mod errors;
pub mod events;
pub mod payments;
pub mod tickets;
pub mod utils;
pub mod wallets;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
