//! Wallets module - ledger models, invariants, services, and traits.

mod wallets_errors;
mod wallets_model;
mod wallets_service;
mod wallets_traits;


pub use wallets_errors::WalletError;
pub use wallets_model::{
    generate_tx_ref, plan_settlement, DepositInitiation, DepositRequest, EventPaymentRequest,
    GoalMovement, LedgerPosting, NewSavingsGoal, NewTransaction, PaymentCallback, PostingLeg,
    PostingResult, SavingsAllocation, SavingsGoal, SavingsPurpose, Settlement, SettlementPlan,
    Transaction, TransactionDirection, TransactionFilter, TransactionKind, TransactionPage,
    TransactionQuery, TransactionStatus, TransferReceipt, TransferRequest, Wallet,
    WalletAmountRequest, SavingsWithdrawRequest,
};
pub use wallets_service::WalletService;
pub use wallets_traits::{WalletRepositoryTrait, WalletServiceTrait};
