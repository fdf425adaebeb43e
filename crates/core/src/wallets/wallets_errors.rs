use rust_decimal::Decimal;
use thiserror::Error;

use super::wallets_model::TransactionStatus;

/// Ledger invariant violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Insufficient savings: available {available}, requested {requested}")]
    InsufficientSavings {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Savings goal {0} is not completed yet")]
    GoalNotCompleted(String),

    #[error("Savings goal {0} is already completed")]
    GoalAlreadyCompleted(String),

    #[error("Cannot transfer money to yourself")]
    SelfTransfer,

    #[error("Invalid transaction status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
}
