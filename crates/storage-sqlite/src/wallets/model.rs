//! Database models for wallets.
//!
//! Amounts are decimal text. Enum columns hold the lowercase names used on
//! the wire, and rows carrying an unknown name fail conversion instead of
//! being guessed at.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use eventhub_core::wallets::{SavingsAllocation, SavingsGoal, Transaction, Wallet};
use eventhub_core::Error;

use crate::utils::{decimal_to_db, parse_ledger_decimal};

#[derive(
    Queryable,
    Insertable,
    Identifiable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::wallets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct WalletDB {
    pub id: String,
    pub user_id: String,
    pub regular_balance: String,
    pub savings_balance: String,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<WalletDB> for Wallet {
    type Error = Error;

    fn try_from(db: WalletDB) -> Result<Self, Self::Error> {
        Ok(Self {
            regular_balance: parse_ledger_decimal(&db.regular_balance, "regular_balance")?,
            savings_balance: parse_ledger_decimal(&db.savings_balance, "savings_balance")?,
            id: db.id,
            user_id: db.user_id,
            currency: db.currency,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

#[derive(
    Queryable,
    Insertable,
    Identifiable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::wallet_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TransactionDB {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub direction: String,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub description: Option<String>,
    pub status: String,
    pub tx_ref: Option<String>,
    pub event_id: Option<String>,
    pub savings_goal_id: Option<String>,
    pub counterparty_user_id: Option<String>,
    pub checkout_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = Error;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            direction: db.direction.parse()?,
            kind: db.kind.parse()?,
            status: db.status.parse()?,
            amount: parse_ledger_decimal(&db.amount, "amount")?,
            id: db.id,
            wallet_id: db.wallet_id,
            user_id: db.user_id,
            currency: db.currency,
            description: db.description,
            tx_ref: db.tx_ref,
            event_id: db.event_id,
            savings_goal_id: db.savings_goal_id,
            counterparty_user_id: db.counterparty_user_id,
            checkout_url: db.checkout_url,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

#[derive(
    Queryable,
    Insertable,
    Identifiable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::savings_goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalDB {
    pub id: String,
    pub wallet_id: String,
    pub name: String,
    pub target_amount: String,
    pub current_amount: String,
    pub is_completed: bool,
    pub purpose: String,
    pub event_id: Option<String>,
    pub organizer_id: Option<String>,
    pub deadline: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<SavingsGoalDB> for SavingsGoal {
    type Error = Error;

    fn try_from(db: SavingsGoalDB) -> Result<Self, Self::Error> {
        Ok(Self {
            purpose: db.purpose.parse()?,
            target_amount: parse_ledger_decimal(&db.target_amount, "target_amount")?,
            current_amount: parse_ledger_decimal(&db.current_amount, "current_amount")?,
            id: db.id,
            wallet_id: db.wallet_id,
            name: db.name,
            is_completed: db.is_completed,
            event_id: db.event_id,
            organizer_id: db.organizer_id,
            deadline: db.deadline,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

#[derive(
    Queryable,
    Insertable,
    Identifiable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::savings_allocations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct SavingsAllocationDB {
    pub id: String,
    pub goal_id: String,
    pub transaction_id: String,
    pub amount: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<SavingsAllocationDB> for SavingsAllocation {
    type Error = Error;

    fn try_from(db: SavingsAllocationDB) -> Result<Self, Self::Error> {
        Ok(Self {
            amount: parse_ledger_decimal(&db.amount, "amount")?,
            id: db.id,
            goal_id: db.goal_id,
            transaction_id: db.transaction_id,
            created_at: db.created_at,
        })
    }
}

impl From<&SavingsAllocation> for SavingsAllocationDB {
    fn from(domain: &SavingsAllocation) -> Self {
        Self {
            id: domain.id.clone(),
            goal_id: domain.goal_id.clone(),
            transaction_id: domain.transaction_id.clone(),
            amount: decimal_to_db(domain.amount),
            created_at: domain.created_at,
        }
    }
}
