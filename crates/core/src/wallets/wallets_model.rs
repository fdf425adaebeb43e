//! Wallet ledger domain models.
//!
//! Balance and goal arithmetic lives here as pure functions so every
//! repository implementation enforces the same invariants inside its own
//! atomic write.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::wallets_errors::WalletError;
use crate::constants::{DEFAULT_TRANSACTIONS_LIMIT, MAX_TRANSACTIONS_LIMIT, TX_REF_PREFIX};
use crate::errors::{Error, ValidationError};
use crate::events::Pagination;
use crate::Result;

/// Per-user wallet. Both balances are never negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    pub regular_balance: Decimal,
    pub savings_balance: Decimal,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Wallet {
    /// Balances after applying both deltas, or the violated invariant.
    pub fn apply_delta(
        &self,
        regular_delta: Decimal,
        savings_delta: Decimal,
    ) -> std::result::Result<(Decimal, Decimal), WalletError> {
        let regular = self.regular_balance + regular_delta;
        if regular < Decimal::ZERO {
            return Err(WalletError::InsufficientBalance {
                available: self.regular_balance,
                requested: -regular_delta,
            });
        }
        let savings = self.savings_balance + savings_delta;
        if savings < Decimal::ZERO {
            return Err(WalletError::InsufficientSavings {
                available: self.savings_balance,
                requested: -savings_delta,
            });
        }
        Ok((regular, savings))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    Credit,
    Debit,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::Credit => "credit",
            TransactionDirection::Debit => "debit",
        }
    }
}

impl FromStr for TransactionDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "credit" => Ok(TransactionDirection::Credit),
            "debit" => Ok(TransactionDirection::Debit),
            other => Err(invalid("direction", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    TransferIn,
    TransferOut,
    SavingsDeposit,
    SavingsWithdraw,
    EventPayment,
    Refund,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::TransferIn => "transfer_in",
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::SavingsDeposit => "savings_deposit",
            TransactionKind::SavingsWithdraw => "savings_withdraw",
            TransactionKind::EventPayment => "event_payment",
            TransactionKind::Refund => "refund",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "transfer_in" => Ok(TransactionKind::TransferIn),
            "transfer_out" => Ok(TransactionKind::TransferOut),
            "savings_deposit" => Ok(TransactionKind::SavingsDeposit),
            "savings_withdraw" => Ok(TransactionKind::SavingsWithdraw),
            "event_payment" => Ok(TransactionKind::EventPayment),
            "refund" => Ok(TransactionKind::Refund),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            other => Err(invalid("transaction kind", other)),
        }
    }
}

/// `pending -> processing -> completed | failed | cancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        match self {
            TransactionStatus::Pending => next != TransactionStatus::Pending,
            TransactionStatus::Processing => next.is_terminal(),
            _ => false,
        }
    }

    /// Statuses a settlement may still move out of.
    pub fn open_statuses() -> [TransactionStatus; 2] {
        [TransactionStatus::Pending, TransactionStatus::Processing]
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "processing" => Ok(TransactionStatus::Processing),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            other => Err(invalid("transaction status", other)),
        }
    }
}

fn invalid(what: &str, value: &str) -> Error {
    Error::Validation(ValidationError::InvalidInput(format!(
        "Unknown {} '{}'",
        what, value
    )))
}

/// Append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub direction: TransactionDirection,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub tx_ref: Option<String>,
    pub event_id: Option<String>,
    pub savings_goal_id: Option<String>,
    pub counterparty_user_id: Option<String>,
    pub checkout_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// Effect on the regular balance once completed.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            TransactionDirection::Credit => self.amount,
            TransactionDirection::Debit => -self.amount,
        }
    }
}

/// Ledger entry to insert. The repository resolves the wallet from `user_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: String,
    pub direction: TransactionDirection,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub tx_ref: Option<String>,
    pub event_id: Option<String>,
    pub savings_goal_id: Option<String>,
    pub counterparty_user_id: Option<String>,
}

impl NewTransaction {
    /// A completed entry with no links.
    pub fn completed(
        user_id: &str,
        direction: TransactionDirection,
        kind: TransactionKind,
        amount: Decimal,
        currency: &str,
        description: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            direction,
            kind,
            amount,
            currency: currency.to_string(),
            description,
            status: TransactionStatus::Completed,
            tx_ref: None,
            event_id: None,
            savings_goal_id: None,
            counterparty_user_id: None,
        }
    }
}

/// Fresh gateway correlation reference.
pub fn generate_tx_ref() -> String {
    format!("{}-{}", TX_REF_PREFIX, Uuid::new_v4().simple())
}

// ─────────────────────────────────────────────────────────────────────────────
// Savings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SavingsPurpose {
    #[default]
    General,
    Event,
    Organizer,
}

impl SavingsPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavingsPurpose::General => "general",
            SavingsPurpose::Event => "event",
            SavingsPurpose::Organizer => "organizer",
        }
    }
}

impl FromStr for SavingsPurpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "general" => Ok(SavingsPurpose::General),
            "event" => Ok(SavingsPurpose::Event),
            "organizer" => Ok(SavingsPurpose::Organizer),
            other => Err(invalid("savings purpose", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub id: String,
    pub wallet_id: String,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub is_completed: bool,
    pub purpose: SavingsPurpose,
    pub event_id: Option<String>,
    pub organizer_id: Option<String>,
    pub deadline: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SavingsGoal {
    /// Goal amount and completion flag after moving `delta` into (positive)
    /// or out of (negative) the goal.
    ///
    /// Deposits into a completed goal are rejected; withdrawals require it.
    pub fn apply_movement(
        &self,
        delta: Decimal,
    ) -> std::result::Result<(Decimal, bool), WalletError> {
        if delta > Decimal::ZERO && self.is_completed {
            return Err(WalletError::GoalAlreadyCompleted(self.id.clone()));
        }
        if delta < Decimal::ZERO {
            if !self.is_completed {
                return Err(WalletError::GoalNotCompleted(self.id.clone()));
            }
            if self.current_amount + delta < Decimal::ZERO {
                return Err(WalletError::InsufficientSavings {
                    available: self.current_amount,
                    requested: -delta,
                });
            }
        }
        let current = self.current_amount + delta;
        Ok((current, self.is_completed || current >= self.target_amount))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSavingsGoal {
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub purpose: SavingsPurpose,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub organizer_id: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
}

impl NewSavingsGoal {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        if self.target_amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidInput(
                "Target amount must be greater than zero".to_string(),
            )
            .into());
        }
        match self.purpose {
            SavingsPurpose::Event if self.event_id.is_none() => {
                Err(ValidationError::MissingField("eventId".to_string()).into())
            }
            SavingsPurpose::Organizer if self.organizer_id.is_none() => {
                Err(ValidationError::MissingField("organizerId".to_string()).into())
            }
            _ => Ok(()),
        }
    }
}

/// History row for one movement into or out of a goal. `amount` is signed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavingsAllocation {
    pub id: String,
    pub goal_id: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub created_at: NaiveDateTime,
}

// ─────────────────────────────────────────────────────────────────────────────
// Atomic postings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct GoalMovement {
    pub goal_id: String,
    pub delta: Decimal,
}

/// One wallet's share of a posting: balance deltas, an optional goal
/// movement and the ledger entry recording it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingLeg {
    pub regular_delta: Decimal,
    pub savings_delta: Decimal,
    pub goal: Option<GoalMovement>,
    pub transaction: NewTransaction,
}

/// Legs committed all-or-nothing. The recipient wallet of a leg is created
/// when missing.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerPosting {
    pub legs: Vec<PostingLeg>,
}

/// Per-leg results in posting order.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingResult {
    pub wallets: Vec<Wallet>,
    pub transactions: Vec<Transaction>,
    pub goals: Vec<SavingsGoal>,
}

/// What a settlement does to a transaction and its wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPlan {
    /// Already terminal or not a valid transition.
    Ignore,
    /// Move to `status`, applying `balance_delta` to the regular balance.
    Transition {
        status: TransactionStatus,
        balance_delta: Decimal,
    },
}

/// Decides the outcome of a gateway callback for `transaction`.
///
/// Only a completed settlement moves money. A completed debit the wallet
/// cannot cover settles as failed instead.
pub fn plan_settlement(
    transaction: &Transaction,
    wallet: &Wallet,
    requested: TransactionStatus,
) -> SettlementPlan {
    if !transaction.status.can_transition_to(requested) {
        return SettlementPlan::Ignore;
    }
    if requested != TransactionStatus::Completed {
        return SettlementPlan::Transition {
            status: requested,
            balance_delta: Decimal::ZERO,
        };
    }
    let delta = transaction.signed_amount();
    match wallet.apply_delta(delta, Decimal::ZERO) {
        Ok(_) => SettlementPlan::Transition {
            status: TransactionStatus::Completed,
            balance_delta: delta,
        },
        Err(_) => SettlementPlan::Transition {
            status: TransactionStatus::Failed,
            balance_delta: Decimal::ZERO,
        },
    }
}

/// Result of applying a gateway callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub transaction: Transaction,
    pub applied: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests and responses
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletAmountRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepositInitiation {
    pub transaction: Transaction,
    pub checkout_url: String,
    pub tx_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(alias = "to_user_id")]
    pub to_user_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub wallet: Wallet,
    pub outgoing: Transaction,
    pub incoming: Transaction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventPaymentRequest {
    #[serde(alias = "event_id")]
    pub event_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SavingsWithdrawRequest {
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Gateway webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentCallback {
    pub tx_ref: String,
    pub status: String,
}

/// Raw history filter as received from the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TransactionFilter {
    pub fn into_query(self) -> Result<TransactionQuery> {
        Ok(TransactionQuery {
            kind: self
                .kind
                .as_deref()
                .map(str::parse::<TransactionKind>)
                .transpose()?,
            status: self
                .status
                .as_deref()
                .map(str::parse::<TransactionStatus>)
                .transpose()?,
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_TRANSACTIONS_LIMIT)
                .clamp(1, MAX_TRANSACTIONS_LIMIT),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub page: i64,
    pub limit: i64,
}

impl TransactionQuery {
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}
