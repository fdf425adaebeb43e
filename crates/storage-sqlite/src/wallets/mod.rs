//! SQLite storage implementation for wallets, the transaction ledger and
//! savings goals.

mod model;
mod repository;

pub use model::{SavingsAllocationDB, SavingsGoalDB, TransactionDB, WalletDB};
pub use repository::WalletRepository;
