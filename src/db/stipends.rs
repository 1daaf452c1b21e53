//! Stipend ledger queries: stipends and their applied-deduction children.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use crate::domain::{Deduction, PaymentStatus, Stipend};

pub async fn insert_stipend(
    tx: &mut PgTransaction<'_, Postgres>,
    stipend: &Stipend,
) -> sqlx::Result<Stipend> {
    sqlx::query_as::<_, Stipend>(
        r#"
        INSERT INTO stipends (
            id, student_id, amount, stipend_class, payment_status, payment_method,
            journal_number, notes, payment_date, linked_transaction_id,
            created_at, modified_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(stipend.id)
    .bind(stipend.student_id)
    .bind(&stipend.amount)
    .bind(stipend.stipend_class.as_str())
    .bind(stipend.payment_status.as_str())
    .bind(&stipend.payment_method)
    .bind(&stipend.journal_number)
    .bind(&stipend.notes)
    .bind(stipend.payment_date)
    .bind(stipend.linked_transaction_id)
    .bind(stipend.created_at)
    .bind(stipend.modified_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn journal_exists<'e>(
    executor: impl PgExecutor<'e>,
    journal_number: &str,
) -> sqlx::Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM stipends WHERE journal_number = $1")
            .bind(journal_number)
            .fetch_one(executor)
            .await?;
    Ok(count > 0)
}

pub async fn get_stipend<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Stipend>> {
    sqlx::query_as::<_, Stipend>("SELECT * FROM stipends WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the stipend for the duration of the enclosing transaction;
/// serialises concurrent lifecycle operations on the same stipend.
pub async fn get_stipend_for_update(
    tx: &mut PgTransaction<'_, Postgres>,
    id: Uuid,
) -> sqlx::Result<Option<Stipend>> {
    sqlx::query_as::<_, Stipend>("SELECT * FROM stipends WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<Stipend>, i64)> {
    let rows = sqlx::query_as::<_, Stipend>(
        r#"
        SELECT * FROM stipends
        WHERE student_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stipends WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

pub async fn insert_deduction(
    tx: &mut PgTransaction<'_, Postgres>,
    deduction: &Deduction,
) -> sqlx::Result<Deduction> {
    sqlx::query_as::<_, Deduction>(
        r#"
        INSERT INTO deductions (
            id, student_id, stipend_id, deduction_rule_id, amount, type_tag,
            description, processing_status, approved_by, approval_date,
            rejection_reason, deduction_date, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(deduction.id)
    .bind(deduction.student_id)
    .bind(deduction.stipend_id)
    .bind(deduction.deduction_rule_id)
    .bind(&deduction.amount)
    .bind(&deduction.type_tag)
    .bind(&deduction.description)
    .bind(deduction.processing_status.as_str())
    .bind(deduction.approved_by)
    .bind(deduction.approval_date)
    .bind(&deduction.rejection_reason)
    .bind(deduction.deduction_date)
    .bind(deduction.created_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn list_deductions<'e>(
    executor: impl PgExecutor<'e>,
    stipend_id: Uuid,
) -> sqlx::Result<Vec<Deduction>> {
    sqlx::query_as::<_, Deduction>(
        "SELECT * FROM deductions WHERE stipend_id = $1 ORDER BY deduction_date ASC, created_at ASC",
    )
    .bind(stipend_id)
    .fetch_all(executor)
    .await
}

/// Sum of already-persisted deductions for a stipend; zero when none exist.
pub async fn sum_deductions<'e>(
    executor: impl PgExecutor<'e>,
    stipend_id: Uuid,
) -> sqlx::Result<BigDecimal> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::numeric(16,2) FROM deductions WHERE stipend_id = $1",
    )
    .bind(stipend_id)
    .fetch_one(executor)
    .await
}

pub async fn update_payment_status(
    tx: &mut PgTransaction<'_, Postgres>,
    id: Uuid,
    status: PaymentStatus,
    payment_date: Option<DateTime<Utc>>,
    linked_transaction_id: Option<Uuid>,
) -> sqlx::Result<Stipend> {
    sqlx::query_as::<_, Stipend>(
        r#"
        UPDATE stipends SET
            payment_status = $2,
            payment_date = COALESCE($3, payment_date),
            linked_transaction_id = COALESCE($4, linked_transaction_id),
            modified_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(payment_date)
    .bind(linked_transaction_id)
    .fetch_one(&mut **tx)
    .await
}
