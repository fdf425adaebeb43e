use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use eventhub_core::utils::time_utils::now_naive;
use eventhub_core::wallets::{
    plan_settlement, LedgerPosting, NewSavingsGoal, NewTransaction, PostingResult,
    SavingsAllocation, SavingsGoal, Settlement, SettlementPlan, Transaction, TransactionQuery,
    TransactionStatus, Wallet, WalletRepositoryTrait,
};
use eventhub_core::{Error, Result};

use super::model::{SavingsAllocationDB, SavingsGoalDB, TransactionDB, WalletDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{savings_allocations, savings_goals, wallet_transactions, wallets};
use crate::utils::decimal_to_db;

pub struct WalletRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl WalletRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        WalletRepository { pool, writer }
    }
}

fn open_status_names() -> Vec<&'static str> {
    TransactionStatus::open_statuses()
        .iter()
        .map(TransactionStatus::as_str)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection-level helpers, shared by reads and write jobs
// ─────────────────────────────────────────────────────────────────────────────

fn find_wallet_by_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<Wallet>> {
    let row = wallets::table
        .filter(wallets::user_id.eq(user_id))
        .select(WalletDB::as_select())
        .first::<WalletDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    row.map(Wallet::try_from).transpose()
}

fn wallet_for_user(conn: &mut SqliteConnection, user_id: &str, currency: &str) -> Result<Wallet> {
    if let Some(wallet) = find_wallet_by_user(conn, user_id)? {
        return Ok(wallet);
    }
    let now = now_naive();
    let row = WalletDB {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        regular_balance: decimal_to_db(Decimal::ZERO),
        savings_balance: decimal_to_db(Decimal::ZERO),
        currency: currency.to_string(),
        created_at: now,
        updated_at: now,
    };
    let inserted = diesel::insert_into(wallets::table)
        .values(&row)
        .returning(WalletDB::as_returning())
        .get_result(conn)
        .map_err(StorageError::from)?;
    log::debug!("Created wallet {} for user {}", inserted.id, user_id);
    Wallet::try_from(inserted)
}

fn write_balances(
    conn: &mut SqliteConnection,
    wallet_id: &str,
    regular: Decimal,
    savings: Decimal,
) -> Result<Wallet> {
    let row = diesel::update(wallets::table.find(wallet_id))
        .set((
            wallets::regular_balance.eq(decimal_to_db(regular)),
            wallets::savings_balance.eq(decimal_to_db(savings)),
            wallets::updated_at.eq(now_naive()),
        ))
        .returning(WalletDB::as_returning())
        .get_result(conn)
        .map_err(StorageError::from)?;
    Wallet::try_from(row)
}

fn insert_transaction_row(
    conn: &mut SqliteConnection,
    wallet_id: &str,
    new_tx: NewTransaction,
) -> Result<Transaction> {
    let now = now_naive();
    let row = TransactionDB {
        id: Uuid::new_v4().to_string(),
        wallet_id: wallet_id.to_string(),
        user_id: new_tx.user_id,
        direction: new_tx.direction.as_str().to_string(),
        kind: new_tx.kind.as_str().to_string(),
        amount: decimal_to_db(new_tx.amount),
        currency: new_tx.currency,
        description: new_tx.description,
        status: new_tx.status.as_str().to_string(),
        tx_ref: new_tx.tx_ref,
        event_id: new_tx.event_id,
        savings_goal_id: new_tx.savings_goal_id,
        counterparty_user_id: new_tx.counterparty_user_id,
        checkout_url: None,
        created_at: now,
        updated_at: now,
    };
    let inserted = diesel::insert_into(wallet_transactions::table)
        .values(&row)
        .returning(TransactionDB::as_returning())
        .get_result(conn)
        .map_err(StorageError::from)?;
    Transaction::try_from(inserted)
}

fn find_transaction(conn: &mut SqliteConnection, transaction_id: &str) -> Result<Transaction> {
    let row = wallet_transactions::table
        .find(transaction_id)
        .select(TransactionDB::as_select())
        .first::<TransactionDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::NotFound(format!("Transaction '{}'", transaction_id)))?;
    Transaction::try_from(row)
}

fn find_transaction_by_tx_ref(
    conn: &mut SqliteConnection,
    tx_ref: &str,
) -> Result<Option<Transaction>> {
    wallet_transactions::table
        .filter(wallet_transactions::tx_ref.eq(tx_ref))
        .select(TransactionDB::as_select())
        .first::<TransactionDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Transaction::try_from)
        .transpose()
}

fn find_goal_in_wallet(
    conn: &mut SqliteConnection,
    goal_id: &str,
    wallet_id: &str,
) -> Result<SavingsGoal> {
    let row = savings_goals::table
        .filter(savings_goals::id.eq(goal_id))
        .filter(savings_goals::wallet_id.eq(wallet_id))
        .select(SavingsGoalDB::as_select())
        .first::<SavingsGoalDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::NotFound(format!("Savings goal '{}'", goal_id)))?;
    SavingsGoal::try_from(row)
}

#[async_trait]
impl WalletRepositoryTrait for WalletRepository {
    fn get_by_user_id(&self, user_id: &str) -> Result<Option<Wallet>> {
        let mut conn = get_connection(&self.pool)?;
        find_wallet_by_user(&mut conn, user_id)
    }

    async fn get_or_create(&self, user_id: &str, currency: &str) -> Result<Wallet> {
        let user_id = user_id.to_string();
        let currency = currency.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Wallet> {
                wallet_for_user(conn, &user_id, &currency)
            })
            .await
    }

    async fn commit_posting(&self, posting: LedgerPosting) -> Result<PostingResult> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PostingResult> {
                let mut result = PostingResult {
                    wallets: Vec::with_capacity(posting.legs.len()),
                    transactions: Vec::with_capacity(posting.legs.len()),
                    goals: Vec::new(),
                };

                // Any error below rolls back every leg already written.
                for leg in posting.legs {
                    let wallet = wallet_for_user(
                        conn,
                        &leg.transaction.user_id,
                        &leg.transaction.currency,
                    )?;
                    let (regular, savings) =
                        wallet.apply_delta(leg.regular_delta, leg.savings_delta)?;
                    let wallet = write_balances(conn, &wallet.id, regular, savings)?;

                    let goal = match &leg.goal {
                        Some(movement) => {
                            let goal = find_goal_in_wallet(conn, &movement.goal_id, &wallet.id)?;
                            let (current, completed) = goal.apply_movement(movement.delta)?;
                            let row = diesel::update(savings_goals::table.find(&goal.id))
                                .set((
                                    savings_goals::current_amount.eq(decimal_to_db(current)),
                                    savings_goals::is_completed.eq(completed),
                                    savings_goals::updated_at.eq(now_naive()),
                                ))
                                .returning(SavingsGoalDB::as_returning())
                                .get_result(conn)
                                .map_err(StorageError::from)?;
                            Some((SavingsGoal::try_from(row)?, movement.delta))
                        }
                        None => None,
                    };

                    let transaction = insert_transaction_row(conn, &wallet.id, leg.transaction)?;

                    if let Some((goal, delta)) = goal {
                        let allocation = SavingsAllocation {
                            id: Uuid::new_v4().to_string(),
                            goal_id: goal.id.clone(),
                            transaction_id: transaction.id.clone(),
                            amount: delta,
                            created_at: transaction.created_at,
                        };
                        diesel::insert_into(savings_allocations::table)
                            .values(SavingsAllocationDB::from(&allocation))
                            .execute(conn)
                            .map_err(StorageError::from)?;
                        result.goals.push(goal);
                    }

                    result.wallets.push(wallet);
                    result.transactions.push(transaction);
                }

                Ok(result)
            })
            .await
    }

    async fn insert_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Transaction> {
                let wallet =
                    wallet_for_user(conn, &new_transaction.user_id, &new_transaction.currency)?;
                insert_transaction_row(conn, &wallet.id, new_transaction)
            })
            .await
    }

    async fn set_checkout_url(
        &self,
        transaction_id: &str,
        checkout_url: &str,
    ) -> Result<Transaction> {
        let transaction_id = transaction_id.to_string();
        let checkout_url = checkout_url.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Transaction> {
                let updated = diesel::update(wallet_transactions::table.find(&transaction_id))
                    .set((
                        wallet_transactions::checkout_url.eq(Some(checkout_url)),
                        wallet_transactions::updated_at.eq(now_naive()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("Transaction '{}'", transaction_id)));
                }
                find_transaction(conn, &transaction_id)
            })
            .await
    }

    async fn mark_transaction_failed(&self, transaction_id: &str) -> Result<Transaction> {
        let transaction_id = transaction_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Transaction> {
                diesel::update(
                    wallet_transactions::table
                        .filter(wallet_transactions::id.eq(&transaction_id))
                        .filter(wallet_transactions::status.eq_any(open_status_names())),
                )
                .set((
                    wallet_transactions::status.eq(TransactionStatus::Failed.as_str()),
                    wallet_transactions::updated_at.eq(now_naive()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                find_transaction(conn, &transaction_id)
            })
            .await
    }

    async fn settle_transaction(
        &self,
        tx_ref: &str,
        requested: TransactionStatus,
    ) -> Result<Settlement> {
        let tx_ref = tx_ref.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Settlement> {
                let transaction = find_transaction_by_tx_ref(conn, &tx_ref)?
                    .ok_or_else(|| Error::NotFound(format!("Transaction '{}'", tx_ref)))?;
                let wallet: Wallet = wallets::table
                    .find(&transaction.wallet_id)
                    .select(WalletDB::as_select())
                    .first::<WalletDB>(conn)
                    .map_err(StorageError::from)?
                    .try_into()?;

                let (status, balance_delta) = match plan_settlement(&transaction, &wallet, requested)
                {
                    SettlementPlan::Ignore => {
                        return Ok(Settlement {
                            transaction,
                            applied: false,
                        })
                    }
                    SettlementPlan::Transition {
                        status,
                        balance_delta,
                    } => (status, balance_delta),
                };

                // Compare-and-set on the open statuses: a row that is already
                // terminal is never moved again.
                let moved = diesel::update(
                    wallet_transactions::table
                        .filter(wallet_transactions::id.eq(&transaction.id))
                        .filter(wallet_transactions::status.eq_any(open_status_names())),
                )
                .set((
                    wallet_transactions::status.eq(status.as_str()),
                    wallet_transactions::updated_at.eq(now_naive()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                if moved == 0 {
                    return Ok(Settlement {
                        transaction: find_transaction(conn, &transaction.id)?,
                        applied: false,
                    });
                }

                if !balance_delta.is_zero() {
                    let (regular, savings) = wallet.apply_delta(balance_delta, Decimal::ZERO)?;
                    write_balances(conn, &wallet.id, regular, savings)?;
                }

                log::info!(
                    "Settled transaction {} ({}) as {}",
                    transaction.id,
                    tx_ref,
                    status
                );
                Ok(Settlement {
                    transaction: find_transaction(conn, &transaction.id)?,
                    applied: true,
                })
            })
            .await
    }

    fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        match find_transaction(&mut conn, transaction_id) {
            Ok(transaction) => Ok(Some(transaction)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn get_transaction_by_tx_ref(&self, tx_ref: &str) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        find_transaction_by_tx_ref(&mut conn, tx_ref)
    }

    fn list_transactions(
        &self,
        wallet_id: &str,
        query: &TransactionQuery,
    ) -> Result<(Vec<Transaction>, i64)> {
        let mut conn = get_connection(&self.pool)?;

        let filtered = || {
            let mut statement: wallet_transactions::BoxedQuery<'_, Sqlite> =
                wallet_transactions::table
                    .filter(wallet_transactions::wallet_id.eq(wallet_id.to_string()))
                    .into_boxed();
            if let Some(kind) = query.kind {
                statement = statement.filter(wallet_transactions::kind.eq(kind.as_str()));
            }
            if let Some(status) = query.status {
                statement = statement.filter(wallet_transactions::status.eq(status.as_str()));
            }
            statement
        };

        let total = filtered()
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        let rows = filtered()
            .order((
                wallet_transactions::created_at.desc(),
                wallet_transactions::id.desc(),
            ))
            .limit(query.limit)
            .offset(query.offset())
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;

        let transactions = rows
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((transactions, total))
    }

    async fn create_savings_goal(
        &self,
        wallet_id: &str,
        new_goal: NewSavingsGoal,
    ) -> Result<SavingsGoal> {
        let wallet_id = wallet_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SavingsGoal> {
                let now = now_naive();
                let row = SavingsGoalDB {
                    id: Uuid::new_v4().to_string(),
                    wallet_id,
                    name: new_goal.name,
                    target_amount: decimal_to_db(new_goal.target_amount),
                    current_amount: decimal_to_db(Decimal::ZERO),
                    is_completed: false,
                    purpose: new_goal.purpose.as_str().to_string(),
                    event_id: new_goal.event_id,
                    organizer_id: new_goal.organizer_id,
                    deadline: new_goal.deadline,
                    created_at: now,
                    updated_at: now,
                };
                let inserted = diesel::insert_into(savings_goals::table)
                    .values(&row)
                    .returning(SavingsGoalDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                SavingsGoal::try_from(inserted)
            })
            .await
    }

    fn list_savings_goals(&self, wallet_id: &str) -> Result<Vec<SavingsGoal>> {
        let mut conn = get_connection(&self.pool)?;
        savings_goals::table
            .filter(savings_goals::wallet_id.eq(wallet_id))
            .order(savings_goals::created_at.asc())
            .select(SavingsGoalDB::as_select())
            .load::<SavingsGoalDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(SavingsGoal::try_from)
            .collect()
    }

    fn get_savings_goal(&self, goal_id: &str) -> Result<Option<SavingsGoal>> {
        let mut conn = get_connection(&self.pool)?;
        savings_goals::table
            .find(goal_id)
            .select(SavingsGoalDB::as_select())
            .first::<SavingsGoalDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(SavingsGoal::try_from)
            .transpose()
    }

    fn list_allocations(&self, goal_id: &str) -> Result<Vec<SavingsAllocation>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = savings_allocations::table
            .filter(savings_allocations::goal_id.eq(goal_id))
            .order(savings_allocations::created_at.asc())
            .select(SavingsAllocationDB::as_select())
            .load::<SavingsAllocationDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(SavingsAllocation::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use eventhub_core::errors::DatabaseError;
    use eventhub_core::wallets::{
        generate_tx_ref, GoalMovement, PostingLeg, SavingsPurpose, TransactionDirection,
        TransactionKind, WalletError,
    };
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    async fn create_test_repository() -> (WalletRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (WalletRepository::new(pool, writer), temp_dir)
    }

    fn leg(
        user_id: &str,
        regular_delta: Decimal,
        direction: TransactionDirection,
        kind: TransactionKind,
    ) -> PostingLeg {
        PostingLeg {
            regular_delta,
            savings_delta: Decimal::ZERO,
            goal: None,
            transaction: NewTransaction::completed(
                user_id,
                direction,
                kind,
                regular_delta.abs(),
                "MWK",
                None,
            ),
        }
    }

    async fn credit(repo: &WalletRepository, user_id: &str, amount: Decimal) {
        repo.commit_posting(LedgerPosting {
            legs: vec![leg(
                user_id,
                amount,
                TransactionDirection::Credit,
                TransactionKind::Deposit,
            )],
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (repo, _temp_dir) = create_test_repository().await;
        let first = repo.get_or_create("user-1", "MWK").await.unwrap();
        let second = repo.get_or_create("user-1", "MWK").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.regular_balance, Decimal::ZERO);
        assert!(repo.get_by_user_id("user-2").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_leg_rolls_back_whole_posting() {
        let (repo, _temp_dir) = create_test_repository().await;
        credit(&repo, "alice", dec!(100)).await;

        // Credit to bob first, then an overdraft on alice.
        let err = repo
            .commit_posting(LedgerPosting {
                legs: vec![
                    leg(
                        "bob",
                        dec!(150),
                        TransactionDirection::Credit,
                        TransactionKind::TransferIn,
                    ),
                    leg(
                        "alice",
                        dec!(-150),
                        TransactionDirection::Debit,
                        TransactionKind::TransferOut,
                    ),
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Wallet(WalletError::InsufficientBalance { .. })
        ));

        let alice = repo.get_by_user_id("alice").unwrap().unwrap();
        assert_eq!(alice.regular_balance, dec!(100));
        assert!(repo.get_by_user_id("bob").unwrap().is_none());
        let (history, total) = repo
            .list_transactions(
                &alice.id,
                &TransactionQuery {
                    kind: None,
                    status: None,
                    page: 1,
                    limit: 20,
                },
            )
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(history[0].kind, TransactionKind::Deposit);
    }

    #[tokio::test]
    async fn test_settlement_applies_once() {
        let (repo, _temp_dir) = create_test_repository().await;
        let tx_ref = generate_tx_ref();
        let mut pending = NewTransaction::completed(
            "carol",
            TransactionDirection::Credit,
            TransactionKind::Deposit,
            dec!(2500),
            "MWK",
            Some("Top up".to_string()),
        );
        pending.status = TransactionStatus::Pending;
        pending.tx_ref = Some(tx_ref.clone());
        let inserted = repo.insert_transaction(pending).await.unwrap();
        let with_url = repo
            .set_checkout_url(&inserted.id, "https://checkout.example/abc")
            .await
            .unwrap();
        assert_eq!(
            with_url.checkout_url.as_deref(),
            Some("https://checkout.example/abc")
        );

        let first = repo
            .settle_transaction(&tx_ref, TransactionStatus::Completed)
            .await
            .unwrap();
        assert!(first.applied);
        assert_eq!(first.transaction.status, TransactionStatus::Completed);

        let replay = repo
            .settle_transaction(&tx_ref, TransactionStatus::Completed)
            .await
            .unwrap();
        assert!(!replay.applied);

        let late_failure = repo
            .settle_transaction(&tx_ref, TransactionStatus::Failed)
            .await
            .unwrap();
        assert!(!late_failure.applied);
        assert_eq!(late_failure.transaction.status, TransactionStatus::Completed);

        let wallet = repo.get_by_user_id("carol").unwrap().unwrap();
        assert_eq!(wallet.regular_balance, dec!(2500));

        let by_ref = repo.get_transaction_by_tx_ref(&tx_ref).unwrap().unwrap();
        assert_eq!(by_ref.id, inserted.id);
        assert!(repo.get_transaction_by_tx_ref("EH-missing").unwrap().is_none());

        let unknown = repo
            .settle_transaction("EH-missing", TransactionStatus::Completed)
            .await
            .unwrap_err();
        assert!(unknown.is_not_found());
    }

    #[tokio::test]
    async fn test_corrupt_balance_is_an_error_not_zero() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.commit_posting(LedgerPosting {
            legs: vec![leg(
                "erin",
                dec!(80),
                TransactionDirection::Credit,
                TransactionKind::Deposit,
            )],
        })
        .await
        .unwrap();
        let wallet = repo.get_by_user_id("erin").unwrap().unwrap();

        let mut conn = get_connection(&repo.pool).unwrap();
        diesel::update(wallets::table.find(&wallet.id))
            .set(wallets::regular_balance.eq("80,00"))
            .execute(&mut conn)
            .unwrap();

        let err = repo.get_by_user_id("erin").unwrap_err();
        assert!(matches!(err, Error::Database(DatabaseError::Internal(_))));

        let posting = repo
            .commit_posting(LedgerPosting {
                legs: vec![leg(
                    "erin",
                    dec!(5),
                    TransactionDirection::Credit,
                    TransactionKind::Deposit,
                )],
            })
            .await;
        assert!(posting.is_err());

        let stored: String = wallets::table
            .find(&wallet.id)
            .select(wallets::regular_balance)
            .first(&mut conn)
            .unwrap();
        assert_eq!(stored, "80,00");
    }

    #[tokio::test]
    async fn test_mark_failed_leaves_terminal_rows() {
        let (repo, _temp_dir) = create_test_repository().await;
        let mut pending = NewTransaction::completed(
            "dan",
            TransactionDirection::Credit,
            TransactionKind::Deposit,
            dec!(10),
            "MWK",
            None,
        );
        pending.status = TransactionStatus::Pending;
        let pending = repo.insert_transaction(pending).await.unwrap();
        let failed = repo.mark_transaction_failed(&pending.id).await.unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);

        credit(&repo, "dan", dec!(5)).await;
        let wallet = repo.get_by_user_id("dan").unwrap().unwrap();
        let (history, _) = repo
            .list_transactions(
                &wallet.id,
                &TransactionQuery {
                    kind: None,
                    status: Some(TransactionStatus::Completed),
                    page: 1,
                    limit: 20,
                },
            )
            .unwrap();
        let completed = repo.mark_transaction_failed(&history[0].id).await.unwrap();
        assert_eq!(completed.status, TransactionStatus::Completed);
    }

    #[tokio::test]
    async fn test_savings_goal_movements_record_allocations() {
        let (repo, _temp_dir) = create_test_repository().await;
        credit(&repo, "erin", dec!(1000)).await;
        let wallet = repo.get_by_user_id("erin").unwrap().unwrap();
        let goal = repo
            .create_savings_goal(
                &wallet.id,
                NewSavingsGoal {
                    name: "Festival pass".to_string(),
                    target_amount: dec!(500),
                    purpose: SavingsPurpose::Event,
                    event_id: Some("42".to_string()),
                    organizer_id: None,
                    deadline: None,
                },
            )
            .await
            .unwrap();

        let save = |amount: Decimal| PostingLeg {
            regular_delta: -amount,
            savings_delta: amount,
            goal: Some(GoalMovement {
                goal_id: goal.id.clone(),
                delta: amount,
            }),
            transaction: NewTransaction {
                savings_goal_id: Some(goal.id.clone()),
                ..NewTransaction::completed(
                    "erin",
                    TransactionDirection::Debit,
                    TransactionKind::SavingsDeposit,
                    amount,
                    "MWK",
                    None,
                )
            },
        };

        let result = repo
            .commit_posting(LedgerPosting {
                legs: vec![save(dec!(500))],
            })
            .await
            .unwrap();
        assert!(result.goals[0].is_completed);
        assert_eq!(result.wallets[0].regular_balance, dec!(500));
        assert_eq!(result.wallets[0].savings_balance, dec!(500));

        // Completed goals take no further deposits.
        let err = repo
            .commit_posting(LedgerPosting {
                legs: vec![save(dec!(1))],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Wallet(WalletError::GoalAlreadyCompleted(_))
        ));

        let allocations = repo.list_allocations(&goal.id).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].amount, dec!(500));
        assert_eq!(allocations[0].transaction_id, result.transactions[0].id);

        let stored = repo.get_savings_goal(&goal.id).unwrap().unwrap();
        assert_eq!(stored.current_amount, dec!(500));
        assert_eq!(repo.list_savings_goals(&wallet.id).unwrap().len(), 1);

        // A goal is only reachable through its own wallet.
        credit(&repo, "mallory", dec!(10)).await;
        let err = repo
            .commit_posting(LedgerPosting {
                legs: vec![PostingLeg {
                    transaction: NewTransaction {
                        user_id: "mallory".to_string(),
                        ..save(dec!(1)).transaction
                    },
                    ..save(dec!(1))
                }],
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
