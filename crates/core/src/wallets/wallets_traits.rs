use async_trait::async_trait;
use rust_decimal::Decimal;

use super::wallets_model::{
    DepositInitiation, DepositRequest, EventPaymentRequest, LedgerPosting, NewSavingsGoal,
    NewTransaction, PostingResult, SavingsAllocation, SavingsGoal, Settlement, Transaction,
    TransactionFilter, TransactionPage, TransactionQuery, TransactionStatus, TransferReceipt,
    TransferRequest, Wallet,
};
use crate::errors::Result;

/// Persistence contract for the wallet ledger.
///
/// Every async method is one atomic write: either all of its rows change or
/// none do.
#[async_trait]
pub trait WalletRepositoryTrait: Send + Sync {
    fn get_by_user_id(&self, user_id: &str) -> Result<Option<Wallet>>;

    async fn get_or_create(&self, user_id: &str, currency: &str) -> Result<Wallet>;

    /// Applies every leg's deltas, goal movements, ledger entries and
    /// allocation rows, or nothing when any invariant fails.
    async fn commit_posting(&self, posting: LedgerPosting) -> Result<PostingResult>;

    /// Inserts a ledger entry without touching balances.
    async fn insert_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction>;

    async fn set_checkout_url(&self, transaction_id: &str, checkout_url: &str)
        -> Result<Transaction>;

    /// Moves an open transaction to `failed`. Terminal transactions are left as they are.
    async fn mark_transaction_failed(&self, transaction_id: &str) -> Result<Transaction>;

    /// Settles the transaction with `tx_ref`, applying the balance change at
    /// most once. See [`super::plan_settlement`].
    async fn settle_transaction(
        &self,
        tx_ref: &str,
        requested: TransactionStatus,
    ) -> Result<Settlement>;

    fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>>;

    fn get_transaction_by_tx_ref(&self, tx_ref: &str) -> Result<Option<Transaction>>;

    fn list_transactions(
        &self,
        wallet_id: &str,
        query: &TransactionQuery,
    ) -> Result<(Vec<Transaction>, i64)>;

    async fn create_savings_goal(
        &self,
        wallet_id: &str,
        new_goal: NewSavingsGoal,
    ) -> Result<SavingsGoal>;

    fn list_savings_goals(&self, wallet_id: &str) -> Result<Vec<SavingsGoal>>;

    fn get_savings_goal(&self, goal_id: &str) -> Result<Option<SavingsGoal>>;

    fn list_allocations(&self, goal_id: &str) -> Result<Vec<SavingsAllocation>>;
}

/// Wallet operations exposed to the API layer.
#[async_trait]
pub trait WalletServiceTrait: Send + Sync {
    async fn get_wallet(&self, user_id: &str) -> Result<Wallet>;

    async fn credit_wallet(
        &self,
        user_id: &str,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction>;

    async fn debit_wallet(
        &self,
        user_id: &str,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction>;

    async fn pay_for_event(
        &self,
        user_id: &str,
        request: EventPaymentRequest,
    ) -> Result<Transaction>;

    /// Opens a gateway checkout. The balance changes only when the callback settles it.
    async fn deposit_money(
        &self,
        user_id: &str,
        request: DepositRequest,
    ) -> Result<DepositInitiation>;

    /// Settles the deposit with `tx_ref` from the gateway's verified record.
    /// `reported_status` is what the callback claimed and is never trusted.
    async fn handle_payment_callback(
        &self,
        tx_ref: &str,
        reported_status: &str,
    ) -> Result<Settlement>;

    async fn transfer_money(
        &self,
        from_user_id: &str,
        request: TransferRequest,
    ) -> Result<TransferReceipt>;

    async fn create_savings_goal(
        &self,
        user_id: &str,
        new_goal: NewSavingsGoal,
    ) -> Result<SavingsGoal>;

    async fn list_savings_goals(&self, user_id: &str) -> Result<Vec<SavingsGoal>>;

    async fn list_goal_allocations(
        &self,
        user_id: &str,
        goal_id: &str,
    ) -> Result<Vec<SavingsAllocation>>;

    async fn deposit_to_savings(
        &self,
        user_id: &str,
        goal_id: &str,
        amount: Decimal,
    ) -> Result<SavingsGoal>;

    /// `amount` defaults to the goal's full current amount.
    async fn withdraw_from_savings(
        &self,
        user_id: &str,
        goal_id: &str,
        amount: Option<Decimal>,
    ) -> Result<SavingsGoal>;

    async fn list_transactions(
        &self,
        user_id: &str,
        filter: TransactionFilter,
    ) -> Result<TransactionPage>;

    fn get_transaction(&self, user_id: &str, transaction_id: &str) -> Result<Transaction>;
}
