//! Transfer engine queries. Status moves happen through conditional
//! updates guarded by the current status, so a lost race surfaces as zero
//! affected rows instead of a clobbered state.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use crate::domain::Transaction;

pub async fn insert_transaction(
    tx: &mut PgTransaction<'_, Postgres>,
    transaction: &Transaction,
) -> sqlx::Result<Transaction> {
    sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (
            id, stipend_id, student_id, amount, source_account, destination_account,
            destination_bank, status, payment_method, transaction_type,
            reference_number, error_message, remarks, attempt_sequence,
            correlation_id, initiated_at, processed_at, completed_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING *
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.stipend_id)
    .bind(transaction.student_id)
    .bind(&transaction.amount)
    .bind(&transaction.source_account)
    .bind(&transaction.destination_account)
    .bind(&transaction.destination_bank)
    .bind(transaction.status.as_str())
    .bind(&transaction.payment_method)
    .bind(transaction.transaction_type.as_str())
    .bind(&transaction.reference_number)
    .bind(&transaction.error_message)
    .bind(&transaction.remarks)
    .bind(transaction.attempt_sequence)
    .bind(transaction.correlation_id)
    .bind(transaction.initiated_at)
    .bind(transaction.processed_at)
    .bind(transaction.completed_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_transaction<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// The non-terminal transaction for a stipend, if one exists. SUCCESS and
/// CANCELLED are terminal; FAILED stays open for retry.
pub async fn find_open_for_stipend<'e>(
    executor: impl PgExecutor<'e>,
    stipend_id: Uuid,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE stipend_id = $1 AND status IN ('PENDING', 'PROCESSING', 'FAILED')
        "#,
    )
    .bind(stipend_id)
    .fetch_optional(executor)
    .await
}

/// Claims a PENDING transaction for processing. Returns None when another
/// worker won the race or the transaction is not PENDING.
pub async fn claim_for_processing<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    correlation_id: Uuid,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = 'PROCESSING', processed_at = NOW(), correlation_id = $2
        WHERE id = $1 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(correlation_id)
    .fetch_optional(executor)
    .await
}

pub async fn complete_success(
    tx: &mut PgTransaction<'_, Postgres>,
    id: Uuid,
    reference_number: &str,
    completed_at: DateTime<Utc>,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = 'SUCCESS', reference_number = $2, completed_at = $3
        WHERE id = $1 AND status = 'PROCESSING'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(reference_number)
    .bind(completed_at)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn complete_failed<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    error_message: &str,
    completed_at: DateTime<Utc>,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = 'FAILED', error_message = $2, completed_at = $3
        WHERE id = $1 AND status = 'PROCESSING'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(error_message)
    .bind(completed_at)
    .fetch_optional(executor)
    .await
}

/// Cancellation is legal from PENDING and PROCESSING only.
pub async fn cancel<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    remarks: &str,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = 'CANCELLED', remarks = $2, completed_at = NOW()
        WHERE id = $1 AND status IN ('PENDING', 'PROCESSING')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(remarks)
    .fetch_optional(executor)
    .await
}

/// Resets a FAILED transaction to PENDING for another settlement attempt:
/// clears the error, bumps the attempt sequence (the oracle idempotency
/// key), keeps timestamps of the prior attempt out of the way.
pub async fn reset_for_retry<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = 'PENDING', error_message = NULL, completed_at = NULL,
            processed_at = NULL, attempt_sequence = attempt_sequence + 1
        WHERE id = $1 AND status = 'FAILED'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_stipend(pool: &PgPool, stipend_id: Uuid) -> sqlx::Result<Vec<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE stipend_id = $1 ORDER BY initiated_at ASC",
    )
    .bind(stipend_id)
    .fetch_all(pool)
    .await
}

pub async fn list_by_student(
    pool: &PgPool,
    student_id: Uuid,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<Transaction>, i64)> {
    let rows = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE student_id = $1
        ORDER BY initiated_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE student_id = $1")
            .bind(student_id)
            .fetch_one(pool)
            .await?;

    Ok((rows, total))
}
