//! Transfer engine: drives a transaction through its state machine and
//! talks to the settlement oracle. Transitions are claim-style conditional
//! updates, so a lost race surfaces as IllegalState rather than a clobbered
//! row. Oracle failures become FAILED transaction state; they are not
//! propagated as request errors.

use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clients::{BankingDirectory, SettlementOracle, SettlementRequest};
use crate::db::{audit::AuditLog, stipends, transactions};
use crate::domain::{audit::ENTITY_TRANSACTION, PaymentStatus, Transaction, TransactionType};
use crate::error::AppError;
use crate::services::ledger::Ledger;

pub struct TransferEngine {
    pool: sqlx::PgPool,
    banking: Arc<dyn BankingDirectory>,
    oracle: Arc<dyn SettlementOracle>,
    source_account: String,
    settle_timeout: Duration,
}

impl TransferEngine {
    pub fn new(
        pool: sqlx::PgPool,
        banking: Arc<dyn BankingDirectory>,
        oracle: Arc<dyn SettlementOracle>,
        source_account: String,
        settle_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            banking,
            oracle,
            source_account,
            settle_timeout,
        }
    }

    /// Creates a PENDING transaction for the stipend's net amount. The
    /// stipend row lock serialises concurrent initiations; at most one
    /// non-terminal transaction exists per stipend.
    pub async fn initiate(
        &self,
        stipend_id: Uuid,
        payment_method: String,
        actor: &str,
    ) -> Result<Transaction, AppError> {
        // Resolve bank details before taking the row lock; the lookup can
        // be slow and needs no serialisation.
        let stipend = stipends::get_stipend(&self.pool, stipend_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stipend {stipend_id}")))?;
        let account = self.banking.resolve_account(stipend.student_id).await?;

        let mut tx = self.pool.begin().await?;

        let stipend = stipends::get_stipend_for_update(&mut tx, stipend_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stipend {stipend_id}")))?;

        if stipend.payment_status != PaymentStatus::Pending {
            return Err(AppError::IllegalState(format!(
                "cannot initiate a transfer for a {} stipend",
                stipend.payment_status.as_str()
            )));
        }

        let deducted = stipends::sum_deductions(&mut *tx, stipend_id).await?;
        let net = (&stipend.amount - &deducted).with_scale(2);
        if net <= BigDecimal::from(0) {
            return Err(AppError::InvalidInput(format!(
                "stipend {stipend_id} has a non-positive net amount {net}"
            )));
        }

        if let Some(open) = transactions::find_open_for_stipend(&mut *tx, stipend_id).await? {
            return Err(AppError::IllegalState(format!(
                "stipend {stipend_id} already has a {} transaction {}",
                open.status.as_str(),
                open.id
            )));
        }

        let transaction = Transaction::new(
            stipend_id,
            stipend.student_id,
            net,
            self.source_account.clone(),
            account.account_number,
            account.bank_name,
            payment_method,
            TransactionType::Stipend,
        );
        let transaction = transactions::insert_transaction(&mut tx, &transaction).await?;

        AuditLog::log_creation(
            &mut tx,
            ENTITY_TRANSACTION,
            transaction.id,
            serde_json::to_value(&transaction)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            "transfer initiated",
        )
        .await?;

        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            stipend_id = %stipend_id,
            amount = %transaction.amount,
            "transfer initiated"
        );
        Ok(transaction)
    }

    /// PENDING -> PROCESSING -> SUCCESS | FAILED. Exactly one concurrent
    /// caller wins the claim; the loser observes IllegalState. The oracle
    /// call is bounded by the engine deadline; on expiry the transaction is
    /// FAILED and the correlation id stays on the row for reconciliation.
    pub async fn process(&self, tx_id: Uuid, actor: &str) -> Result<Transaction, AppError> {
        let correlation_id = Uuid::new_v4();

        let claimed = transactions::claim_for_processing(&self.pool, tx_id, correlation_id)
            .await?;
        let claimed = match claimed {
            Some(t) => t,
            None => {
                let existing = transactions::get_transaction(&self.pool, tx_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("transaction {tx_id}")))?;
                return Err(AppError::IllegalState(format!(
                    "cannot process a {} transaction",
                    existing.status.as_str()
                )));
            }
        };

        let request = SettlementRequest {
            transaction_id: claimed.id,
            stipend_id: claimed.stipend_id,
            attempt_sequence: claimed.attempt_sequence,
            correlation_id,
            amount: claimed.amount.clone(),
            source_account: claimed.source_account.clone(),
            destination_account: claimed.destination_account.clone(),
            destination_bank: claimed.destination_bank.clone(),
            payment_method: claimed.payment_method.clone(),
        };

        let outcome =
            tokio::time::timeout(self.settle_timeout, self.oracle.settle(&request)).await;

        match outcome {
            Ok(Ok(receipt)) => self.finish_success(&claimed, &receipt.reference_number, actor).await,
            Ok(Err(err)) => {
                warn!(
                    transaction_id = %tx_id,
                    correlation_id = %correlation_id,
                    error = %err,
                    "settlement failed"
                );
                self.finish_failed(&claimed, &err.to_string(), actor).await
            }
            Err(_) => {
                error!(
                    transaction_id = %tx_id,
                    correlation_id = %correlation_id,
                    timeout_secs = self.settle_timeout.as_secs(),
                    "settlement timed out; correlation id recorded for reconciliation"
                );
                self.finish_failed(&claimed, "timeout awaiting settlement oracle", actor)
                    .await
            }
        }
    }

    /// Completes the transaction and back-propagates Processed to the
    /// stipend in the same unit of work.
    async fn finish_success(
        &self,
        claimed: &Transaction,
        reference_number: &str,
        actor: &str,
    ) -> Result<Transaction, AppError> {
        let completed_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated =
            transactions::complete_success(&mut tx, claimed.id, reference_number, completed_at)
                .await?
                .ok_or_else(|| {
                    AppError::IllegalState(format!(
                        "transaction {} left PROCESSING during settlement",
                        claimed.id
                    ))
                })?;

        Ledger::back_propagate(
            &mut tx,
            claimed.stipend_id,
            PaymentStatus::Processed,
            updated.completed_at,
            Some(claimed.id),
        )
        .await?;

        AuditLog::log_update(
            &mut tx,
            ENTITY_TRANSACTION,
            claimed.id,
            serde_json::to_value(claimed).map_err(|e| AppError::Internal(e.to_string()))?,
            serde_json::to_value(&updated).map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            "settlement succeeded, stipend processed",
        )
        .await?;

        tx.commit().await?;

        info!(
            transaction_id = %claimed.id,
            reference_number,
            "transfer settled"
        );
        Ok(updated)
    }

    /// Marks the transaction FAILED. The stipend stays Pending; it fails
    /// only when an operator declines the retry.
    async fn finish_failed(
        &self,
        claimed: &Transaction,
        error_message: &str,
        actor: &str,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated =
            transactions::complete_failed(&mut *tx, claimed.id, error_message, Utc::now())
                .await?
                .ok_or_else(|| {
                    AppError::IllegalState(format!(
                        "transaction {} left PROCESSING during settlement",
                        claimed.id
                    ))
                })?;

        AuditLog::log_update(
            &mut tx,
            ENTITY_TRANSACTION,
            claimed.id,
            serde_json::to_value(claimed).map_err(|e| AppError::Internal(e.to_string()))?,
            serde_json::to_value(&updated).map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            "settlement failed",
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Legal from PENDING and PROCESSING only.
    pub async fn cancel(
        &self,
        tx_id: Uuid,
        reason: &str,
        actor: &str,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = transactions::get_transaction(&mut *tx, tx_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {tx_id}")))?;

        let updated = transactions::cancel(&mut *tx, tx_id, reason)
            .await?
            .ok_or_else(|| {
                AppError::IllegalState(format!(
                    "cannot cancel a {} transaction",
                    before.status.as_str()
                ))
            })?;

        AuditLog::log_update(
            &mut tx,
            ENTITY_TRANSACTION,
            tx_id,
            serde_json::to_value(&before).map_err(|e| AppError::Internal(e.to_string()))?,
            serde_json::to_value(&updated).map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            "transfer cancelled",
        )
        .await?;

        tx.commit().await?;

        info!(transaction_id = %tx_id, reason, "transfer cancelled");
        Ok(updated)
    }

    /// Legal from FAILED only: resets to PENDING with a bumped attempt
    /// sequence, then immediately re-invokes Process.
    pub async fn retry(&self, tx_id: Uuid, actor: &str) -> Result<Transaction, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = transactions::get_transaction(&mut *tx, tx_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {tx_id}")))?;

        let reset = transactions::reset_for_retry(&mut *tx, tx_id)
            .await?
            .ok_or_else(|| {
                AppError::IllegalState(format!(
                    "cannot retry a {} transaction",
                    before.status.as_str()
                ))
            })?;

        AuditLog::log_update(
            &mut tx,
            ENTITY_TRANSACTION,
            tx_id,
            serde_json::to_value(&before).map_err(|e| AppError::Internal(e.to_string()))?,
            serde_json::to_value(&reset).map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            &format!("retry queued, attempt {}", reset.attempt_sequence),
        )
        .await?;

        tx.commit().await?;

        info!(
            transaction_id = %tx_id,
            attempt = reset.attempt_sequence,
            "transfer retry queued"
        );

        self.process(tx_id, actor).await
    }

    pub async fn get_status(&self, tx_id: Uuid) -> Result<Transaction, AppError> {
        transactions::get_transaction(&self.pool, tx_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {tx_id}")))
    }

    pub async fn list_by_stipend(&self, stipend_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        Ok(transactions::list_by_stipend(&self.pool, stipend_id).await?)
    }

    pub async fn list_by_student(
        &self,
        student_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, i64), AppError> {
        Ok(transactions::list_by_student(&self.pool, student_id, limit, offset).await?)
    }
}
