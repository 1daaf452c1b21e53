//! Stipend ledger: the write side of stipends and their applied
//! deductions. Creation and the initial deduction batch commit as one unit
//! of work; payment-status moves are serialised by a row lock on the
//! stipend.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{audit::AuditLog, stipends};
use crate::domain::{
    audit::{ENTITY_DEDUCTION, ENTITY_STIPEND},
    AuditAction, Deduction, NewStipend, PaymentStatus, Stipend,
};
use crate::error::AppError;
use crate::services::calculator::AppliedDeduction;
use crate::services::validation;

#[derive(Debug, Clone, Serialize)]
pub struct CreatedStipend {
    pub stipend: Stipend,
    pub deductions: Vec<Deduction>,
}

#[derive(Clone)]
pub struct Ledger {
    pool: PgPool,
}

impl Ledger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a stipend together with its initial deduction batch. If any
    /// step fails the stipend is never visible to a reader.
    ///
    /// Duplicate journal numbers are rejected before anything is written,
    /// so no audit event is emitted for them.
    pub async fn create_stipend(
        &self,
        input: NewStipend,
        applied: &[AppliedDeduction],
        actor: &str,
    ) -> Result<CreatedStipend, AppError> {
        validation::validate_stipend(&input).into_result()?;

        let mut tx = self.pool.begin().await?;

        if stipends::journal_exists(&mut *tx, &input.journal_number).await? {
            return Err(AppError::DuplicateJournal(input.journal_number));
        }

        let stipend = Stipend::new(
            input.student_id,
            input.stipend_class,
            input.amount,
            input.payment_method,
            input.journal_number,
            input.notes,
        );
        let stipend = stipends::insert_stipend(&mut tx, &stipend).await?;

        AuditLog::log_creation(
            &mut tx,
            ENTITY_STIPEND,
            stipend.id,
            serde_json::to_value(&stipend)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            "stipend created",
        )
        .await?;

        let deductions = self
            .apply_deductions_in_tx(&mut tx, &stipend, applied, actor)
            .await?;

        tx.commit().await?;

        info!(
            stipend_id = %stipend.id,
            student_id = %stipend.student_id,
            deductions = deductions.len(),
            "stipend created"
        );

        Ok(CreatedStipend { stipend, deductions })
    }

    /// Persists a further deduction batch against an existing stipend.
    pub async fn apply_deductions(
        &self,
        stipend_id: Uuid,
        applied: &[AppliedDeduction],
        actor: &str,
    ) -> Result<Vec<Deduction>, AppError> {
        let mut tx = self.pool.begin().await?;

        let stipend = stipends::get_stipend_for_update(&mut tx, stipend_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stipend {stipend_id}")))?;

        if stipend.payment_status != PaymentStatus::Pending {
            return Err(AppError::IllegalState(format!(
                "cannot apply deductions to a {} stipend",
                stipend.payment_status.as_str()
            )));
        }

        let deductions = self
            .apply_deductions_in_tx(&mut tx, &stipend, applied, actor)
            .await?;

        tx.commit().await?;
        Ok(deductions)
    }

    /// Inserts the non-zero entries of a calculated batch. Zero-amount
    /// entries stay in the calculation result for observability but never
    /// become rows.
    async fn apply_deductions_in_tx(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        stipend: &Stipend,
        applied: &[AppliedDeduction],
        actor: &str,
    ) -> Result<Vec<Deduction>, AppError> {
        let existing = stipends::sum_deductions(&mut **tx, stipend.id).await?;
        let batch_total: BigDecimal = applied.iter().map(|a| a.amount.clone()).sum();

        validation::validate_deduction_batch(&stipend.amount, &existing, &batch_total)
            .into_result()
            .map_err(|e| match e {
                AppError::InvalidInput(msg) => AppError::InvariantViolation(msg),
                other => other,
            })?;

        let mut deductions = Vec::new();
        for entry in applied {
            if entry.skipped || entry.amount == BigDecimal::from(0) {
                continue;
            }
            let deduction = Deduction::new(
                stipend.student_id,
                stipend.id,
                entry.rule_id,
                entry.amount.clone(),
                entry.type_tag.clone(),
                entry.description.clone(),
            );
            deductions.push(stipends::insert_deduction(tx, &deduction).await?);
        }

        if !deductions.is_empty() {
            AuditLog::log_creation(
                tx,
                ENTITY_DEDUCTION,
                stipend.id,
                serde_json::to_value(&deductions)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
                actor,
                "deduction batch applied",
            )
            .await?;
        }

        Ok(deductions)
    }

    pub async fn get_stipend(&self, id: Uuid) -> Result<Stipend, AppError> {
        stipends::get_stipend(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stipend {id}")))
    }

    pub async fn list_for_student(
        &self,
        student_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Stipend>, i64), AppError> {
        Ok(stipends::list_for_student(&self.pool, student_id, limit, offset).await?)
    }

    pub async fn list_deductions(&self, stipend_id: Uuid) -> Result<Vec<Deduction>, AppError> {
        Ok(stipends::list_deductions(&self.pool, stipend_id).await?)
    }

    /// Operator-facing status change. Self-loops are tolerated no-ops that
    /// log at warning level and leave a no-op audit entry; every other
    /// transition must be legal for the machine.
    pub async fn set_payment_status(
        &self,
        id: Uuid,
        new_status: PaymentStatus,
        when: Option<DateTime<Utc>>,
        actor: &str,
    ) -> Result<Stipend, AppError> {
        let mut tx = self.pool.begin().await?;

        let stipend = stipends::get_stipend_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stipend {id}")))?;

        if stipend.payment_status == new_status {
            warn!(
                stipend_id = %id,
                status = new_status.as_str(),
                "payment status self-loop ignored"
            );
            let snapshot = serde_json::to_value(&stipend)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            AuditLog::log_update(
                &mut tx,
                ENTITY_STIPEND,
                id,
                snapshot.clone(),
                snapshot,
                actor,
                "payment status unchanged (no-op)",
            )
            .await?;
            tx.commit().await?;
            return Ok(stipend);
        }

        if !stipend.payment_status.can_transition_to(new_status) {
            let err = AppError::IllegalState(format!(
                "payment status cannot move from {} to {}",
                stipend.payment_status.as_str(),
                new_status.as_str()
            ));
            AuditLog::log_failed(
                &mut tx,
                AuditAction::Update,
                ENTITY_STIPEND,
                id,
                serde_json::to_value(&stipend).ok(),
                actor,
                &err.to_string(),
            )
            .await?;
            tx.commit().await?;
            return Err(err);
        }

        let old_snapshot = serde_json::to_value(&stipend)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        // A payment date exists only once the stipend is Processed.
        let payment_date = match new_status {
            PaymentStatus::Processed => when,
            _ => None,
        };
        let updated =
            stipends::update_payment_status(&mut tx, id, new_status, payment_date, None).await?;

        AuditLog::log_update(
            &mut tx,
            ENTITY_STIPEND,
            id,
            old_snapshot,
            serde_json::to_value(&updated)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            "payment status changed",
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Marks the stipend Failed after an operator declines to retry its
    /// failed transaction. This is the only path from Pending to Failed.
    pub async fn decline_retry(
        &self,
        stipend_id: Uuid,
        reason: &str,
        actor: &str,
    ) -> Result<Stipend, AppError> {
        let mut tx = self.pool.begin().await?;

        let stipend = stipends::get_stipend_for_update(&mut tx, stipend_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stipend {stipend_id}")))?;

        if !stipend
            .payment_status
            .can_transition_to(PaymentStatus::Failed)
        {
            return Err(AppError::IllegalState(format!(
                "cannot decline retry for a {} stipend",
                stipend.payment_status.as_str()
            )));
        }

        let open = crate::db::transactions::find_open_for_stipend(&mut *tx, stipend_id).await?;
        match open {
            Some(t) if t.status.can_retry() => {}
            _ => {
                return Err(AppError::IllegalState(
                    "no failed transaction awaiting a retry decision".to_string(),
                ))
            }
        }

        let old_snapshot = serde_json::to_value(&stipend)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        // The stipend was never paid out, so it keeps no payment date.
        let updated = stipends::update_payment_status(
            &mut tx,
            stipend_id,
            PaymentStatus::Failed,
            None,
            None,
        )
        .await?;

        AuditLog::log_update(
            &mut tx,
            ENTITY_STIPEND,
            stipend_id,
            old_snapshot,
            serde_json::to_value(&updated)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            actor,
            &format!("retry declined: {reason}"),
        )
        .await?;

        tx.commit().await?;

        info!(stipend_id = %stipend_id, reason, "retry declined, stipend failed");
        Ok(updated)
    }

    /// Back-propagation hook for the transfer engine: moves the stipend in
    /// the caller's transaction without emitting its own audit event (the
    /// engine's transaction event covers the unit of work).
    pub(crate) async fn back_propagate(
        tx: &mut PgTransaction<'_, Postgres>,
        stipend_id: Uuid,
        new_status: PaymentStatus,
        when: Option<DateTime<Utc>>,
        linked_transaction_id: Option<Uuid>,
    ) -> Result<Stipend, AppError> {
        let stipend = stipends::get_stipend_for_update(tx, stipend_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("stipend {stipend_id}")))?;

        if !stipend.payment_status.can_transition_to(new_status) {
            return Err(AppError::IllegalState(format!(
                "payment status cannot move from {} to {}",
                stipend.payment_status.as_str(),
                new_status.as_str()
            )));
        }

        Ok(stipends::update_payment_status(
            tx,
            stipend_id,
            new_status,
            when,
            linked_transaction_id,
        )
        .await?)
    }
}
