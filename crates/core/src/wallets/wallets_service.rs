use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::wallets_errors::WalletError;
use super::wallets_model::{
    generate_tx_ref, DepositInitiation, DepositRequest, EventPaymentRequest, GoalMovement,
    LedgerPosting, NewSavingsGoal, NewTransaction, PostingLeg, PostingResult, SavingsAllocation,
    SavingsGoal, Settlement, Transaction, TransactionDirection, TransactionFilter, TransactionKind,
    TransactionPage, TransactionStatus, TransferReceipt, TransferRequest, Wallet,
};
use super::wallets_traits::{WalletRepositoryTrait, WalletServiceTrait};
use crate::constants::DEFAULT_CURRENCY;
use crate::errors::{Error, Result, ValidationError};
use crate::events::Pagination;
use crate::payments::{CheckoutRequest, GatewayStatus, PaymentGatewayTrait};

/// Service for the wallet ledger.
pub struct WalletService {
    repository: Arc<dyn WalletRepositoryTrait>,
    gateway: Arc<dyn PaymentGatewayTrait>,
    currency: String,
}

impl WalletService {
    pub fn new(
        repository: Arc<dyn WalletRepositoryTrait>,
        gateway: Arc<dyn PaymentGatewayTrait>,
    ) -> Self {
        Self {
            repository,
            gateway,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    async fn post_single(&self, leg: PostingLeg) -> Result<PostingResult> {
        self.repository
            .commit_posting(LedgerPosting { legs: vec![leg] })
            .await
    }

    /// Loads the caller's wallet and one of its goals.
    async fn goal_for_user(&self, user_id: &str, goal_id: &str) -> Result<(Wallet, SavingsGoal)> {
        let wallet = self.get_wallet(user_id).await?;
        match self.repository.get_savings_goal(goal_id)? {
            Some(goal) if goal.wallet_id == wallet.id => Ok((wallet, goal)),
            _ => Err(Error::NotFound(format!("Savings goal '{}'", goal_id))),
        }
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidInput(
            "Amount must be greater than zero".to_string(),
        )
        .into());
    }
    Ok(())
}

fn first<T>(items: Vec<T>, what: &str) -> Result<T> {
    items
        .into_iter()
        .next()
        .ok_or_else(|| Error::Unexpected(format!("Posting returned no {}", what)))
}

#[async_trait]
impl WalletServiceTrait for WalletService {
    async fn get_wallet(&self, user_id: &str) -> Result<Wallet> {
        self.repository.get_or_create(user_id, &self.currency).await
    }

    async fn credit_wallet(
        &self,
        user_id: &str,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction> {
        ensure_positive(amount)?;
        let wallet = self.get_wallet(user_id).await?;

        let result = self
            .post_single(PostingLeg {
                regular_delta: amount,
                savings_delta: Decimal::ZERO,
                goal: None,
                transaction: NewTransaction::completed(
                    user_id,
                    TransactionDirection::Credit,
                    TransactionKind::Deposit,
                    amount,
                    &wallet.currency,
                    description,
                ),
            })
            .await?;
        info!("Credited {} {} to wallet of {}", amount, wallet.currency, user_id);
        first(result.transactions, "transaction")
    }

    async fn debit_wallet(
        &self,
        user_id: &str,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction> {
        ensure_positive(amount)?;
        let wallet = self.get_wallet(user_id).await?;

        let result = self
            .post_single(PostingLeg {
                regular_delta: -amount,
                savings_delta: Decimal::ZERO,
                goal: None,
                transaction: NewTransaction::completed(
                    user_id,
                    TransactionDirection::Debit,
                    TransactionKind::Withdrawal,
                    amount,
                    &wallet.currency,
                    description,
                ),
            })
            .await?;
        info!("Debited {} {} from wallet of {}", amount, wallet.currency, user_id);
        first(result.transactions, "transaction")
    }

    async fn pay_for_event(
        &self,
        user_id: &str,
        request: EventPaymentRequest,
    ) -> Result<Transaction> {
        ensure_positive(request.amount)?;
        if request.event_id.trim().is_empty() {
            return Err(ValidationError::MissingField("eventId".to_string()).into());
        }
        let wallet = self.get_wallet(user_id).await?;

        let mut transaction = NewTransaction::completed(
            user_id,
            TransactionDirection::Debit,
            TransactionKind::EventPayment,
            request.amount,
            &wallet.currency,
            request
                .description
                .or_else(|| Some(format!("Payment for event {}", request.event_id))),
        );
        transaction.event_id = Some(request.event_id);

        let result = self
            .post_single(PostingLeg {
                regular_delta: -request.amount,
                savings_delta: Decimal::ZERO,
                goal: None,
                transaction,
            })
            .await?;
        first(result.transactions, "transaction")
    }

    async fn deposit_money(
        &self,
        user_id: &str,
        request: DepositRequest,
    ) -> Result<DepositInitiation> {
        ensure_positive(request.amount)?;
        let wallet = self.get_wallet(user_id).await?;
        let currency = request
            .currency
            .clone()
            .unwrap_or_else(|| wallet.currency.clone());
        let tx_ref = generate_tx_ref();

        let pending = self
            .repository
            .insert_transaction(NewTransaction {
                status: TransactionStatus::Pending,
                tx_ref: Some(tx_ref.clone()),
                ..NewTransaction::completed(
                    user_id,
                    TransactionDirection::Credit,
                    TransactionKind::Deposit,
                    request.amount,
                    &currency,
                    request.description.clone(),
                )
            })
            .await?;

        let checkout = CheckoutRequest {
            tx_ref: tx_ref.clone(),
            amount: request.amount,
            currency,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            title: "Wallet deposit".to_string(),
            description: request.description,
        };

        match self.gateway.create_checkout(checkout).await {
            Ok(session) => {
                let transaction = self
                    .repository
                    .set_checkout_url(&pending.id, &session.checkout_url)
                    .await?;
                info!("Opened checkout {} for {}", tx_ref, user_id);
                Ok(DepositInitiation {
                    transaction,
                    checkout_url: session.checkout_url,
                    tx_ref,
                })
            }
            Err(e) => {
                warn!("Checkout for {} failed: {}", tx_ref, e);
                if let Err(mark_err) = self.repository.mark_transaction_failed(&pending.id).await {
                    warn!("Could not mark {} as failed: {}", tx_ref, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn handle_payment_callback(
        &self,
        tx_ref: &str,
        reported_status: &str,
    ) -> Result<Settlement> {
        let tx_ref = tx_ref.trim();
        if tx_ref.is_empty() {
            return Err(ValidationError::MissingField("tx_ref".to_string()).into());
        }
        let reported = reported_status.parse::<GatewayStatus>()?;

        let transaction = self
            .repository
            .get_transaction_by_tx_ref(tx_ref)?
            .ok_or_else(|| Error::NotFound(format!("Transaction '{}'", tx_ref)))?;
        if transaction.status.is_terminal() {
            debug!(
                "Callback for {} ignored, transaction is {}",
                tx_ref, transaction.status
            );
            return Ok(Settlement {
                transaction,
                applied: false,
            });
        }

        let verification = self.gateway.verify_payment(tx_ref).await?;
        if verification.status != reported {
            warn!(
                "Callback for {} reported {:?} but the gateway has {:?}",
                tx_ref, reported, verification.status
            );
        }
        let mut target = verification.status.settles_to();
        if target == TransactionStatus::Completed && !verification.covers(&transaction) {
            warn!(
                "Verified charge for {} ({} {:?}) does not match the deposit ({} {}), settling as failed",
                tx_ref,
                verification.amount,
                verification.currency,
                transaction.amount,
                transaction.currency
            );
            target = TransactionStatus::Failed;
        }

        let settlement = self.repository.settle_transaction(tx_ref, target).await?;
        if settlement.applied {
            info!("Settled {} as {}", tx_ref, settlement.transaction.status);
        } else {
            debug!(
                "Callback for {} ignored, transaction is {}",
                tx_ref, settlement.transaction.status
            );
        }
        Ok(settlement)
    }

    async fn transfer_money(
        &self,
        from_user_id: &str,
        request: TransferRequest,
    ) -> Result<TransferReceipt> {
        let to_user_id = request.to_user_id.trim().to_string();
        if to_user_id.is_empty() {
            return Err(ValidationError::MissingField("toUserId".to_string()).into());
        }
        if to_user_id == from_user_id {
            return Err(WalletError::SelfTransfer.into());
        }
        ensure_positive(request.amount)?;
        let sender = self.get_wallet(from_user_id).await?;

        let mut outgoing = NewTransaction::completed(
            from_user_id,
            TransactionDirection::Debit,
            TransactionKind::TransferOut,
            request.amount,
            &sender.currency,
            request
                .description
                .clone()
                .or_else(|| Some(format!("Transfer to {}", to_user_id))),
        );
        outgoing.counterparty_user_id = Some(to_user_id.clone());

        let mut incoming = NewTransaction::completed(
            &to_user_id,
            TransactionDirection::Credit,
            TransactionKind::TransferIn,
            request.amount,
            &sender.currency,
            request
                .description
                .or_else(|| Some(format!("Transfer from {}", from_user_id))),
        );
        incoming.counterparty_user_id = Some(from_user_id.to_string());

        let result = self
            .repository
            .commit_posting(LedgerPosting {
                legs: vec![
                    PostingLeg {
                        regular_delta: -request.amount,
                        savings_delta: Decimal::ZERO,
                        goal: None,
                        transaction: outgoing,
                    },
                    PostingLeg {
                        regular_delta: request.amount,
                        savings_delta: Decimal::ZERO,
                        goal: None,
                        transaction: incoming,
                    },
                ],
            })
            .await?;

        info!(
            "Transferred {} {} from {} to {}",
            request.amount, sender.currency, from_user_id, to_user_id
        );

        let mut transactions = result.transactions.into_iter();
        let (outgoing, incoming) = match (transactions.next(), transactions.next()) {
            (Some(out), Some(inc)) => (out, inc),
            _ => return Err(Error::Unexpected("Transfer posting incomplete".to_string())),
        };
        Ok(TransferReceipt {
            wallet: first(result.wallets, "wallet")?,
            outgoing,
            incoming,
        })
    }

    async fn create_savings_goal(
        &self,
        user_id: &str,
        new_goal: NewSavingsGoal,
    ) -> Result<SavingsGoal> {
        new_goal.validate()?;
        let wallet = self.get_wallet(user_id).await?;
        self.repository
            .create_savings_goal(&wallet.id, new_goal)
            .await
    }

    async fn list_savings_goals(&self, user_id: &str) -> Result<Vec<SavingsGoal>> {
        let wallet = self.get_wallet(user_id).await?;
        self.repository.list_savings_goals(&wallet.id)
    }

    async fn list_goal_allocations(
        &self,
        user_id: &str,
        goal_id: &str,
    ) -> Result<Vec<SavingsAllocation>> {
        let (_, goal) = self.goal_for_user(user_id, goal_id).await?;
        self.repository.list_allocations(&goal.id)
    }

    async fn deposit_to_savings(
        &self,
        user_id: &str,
        goal_id: &str,
        amount: Decimal,
    ) -> Result<SavingsGoal> {
        ensure_positive(amount)?;
        let (wallet, goal) = self.goal_for_user(user_id, goal_id).await?;
        if goal.is_completed {
            return Err(WalletError::GoalAlreadyCompleted(goal.id).into());
        }

        let mut transaction = NewTransaction::completed(
            user_id,
            TransactionDirection::Debit,
            TransactionKind::SavingsDeposit,
            amount,
            &wallet.currency,
            Some(format!("Savings deposit to {}", goal.name)),
        );
        transaction.savings_goal_id = Some(goal.id.clone());

        let result = self
            .post_single(PostingLeg {
                regular_delta: -amount,
                savings_delta: amount,
                goal: Some(GoalMovement {
                    goal_id: goal.id,
                    delta: amount,
                }),
                transaction,
            })
            .await?;
        let goal = first(result.goals, "goal")?;
        if goal.is_completed {
            info!("Savings goal {} reached its target", goal.id);
        }
        Ok(goal)
    }

    async fn withdraw_from_savings(
        &self,
        user_id: &str,
        goal_id: &str,
        amount: Option<Decimal>,
    ) -> Result<SavingsGoal> {
        let (wallet, goal) = self.goal_for_user(user_id, goal_id).await?;
        if !goal.is_completed {
            return Err(WalletError::GoalNotCompleted(goal.id).into());
        }
        let amount = amount.unwrap_or(goal.current_amount);
        ensure_positive(amount)?;
        if amount > goal.current_amount {
            return Err(WalletError::InsufficientSavings {
                available: goal.current_amount,
                requested: amount,
            }
            .into());
        }

        let mut transaction = NewTransaction::completed(
            user_id,
            TransactionDirection::Credit,
            TransactionKind::SavingsWithdraw,
            amount,
            &wallet.currency,
            Some(format!("Savings withdrawal from {}", goal.name)),
        );
        transaction.savings_goal_id = Some(goal.id.clone());

        let result = self
            .post_single(PostingLeg {
                regular_delta: amount,
                savings_delta: -amount,
                goal: Some(GoalMovement {
                    goal_id: goal.id,
                    delta: -amount,
                }),
                transaction,
            })
            .await?;
        first(result.goals, "goal")
    }

    async fn list_transactions(
        &self,
        user_id: &str,
        filter: TransactionFilter,
    ) -> Result<TransactionPage> {
        let query = filter.into_query()?;
        let wallet = self.get_wallet(user_id).await?;
        let (transactions, total) = self.repository.list_transactions(&wallet.id, &query)?;
        Ok(TransactionPage {
            transactions,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    fn get_transaction(&self, user_id: &str, transaction_id: &str) -> Result<Transaction> {
        let transaction = self
            .repository
            .get_transaction(transaction_id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction '{}'", transaction_id)))?;
        if transaction.user_id != user_id {
            return Err(Error::Forbidden(
                "Transaction belongs to another user".to_string(),
            ));
        }
        Ok(transaction)
    }
}
