//! Read-only projection over the committed state: filtered listings for
//! reports and the CSV export surface. Never writes, never locks.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Deduction, PaymentStatus, Stipend, StipendClass, Transaction, TransferStatus};

#[derive(Debug, Clone, Default)]
pub struct StipendFilter {
    pub student_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    pub stipend_class: Option<StipendClass>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_stipends(
    pool: &PgPool,
    filter: &StipendFilter,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<Stipend>, i64)> {
    const WHERE_CLAUSE: &str = r#"
        ($1::uuid IS NULL OR student_id = $1)
        AND ($2::text IS NULL OR payment_status = $2)
        AND ($3::text IS NULL OR stipend_class = $3)
        AND ($4::timestamptz IS NULL OR created_at >= $4)
        AND ($5::timestamptz IS NULL OR created_at <= $5)
    "#;

    let query = format!(
        "SELECT * FROM stipends WHERE {WHERE_CLAUSE} ORDER BY created_at DESC LIMIT $6 OFFSET $7"
    );
    let rows = sqlx::query_as::<_, Stipend>(&query)
        .bind(filter.student_id)
        .bind(filter.payment_status.map(|s| s.as_str()))
        .bind(filter.stipend_class.map(|c| c.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_query = format!("SELECT COUNT(*) FROM stipends WHERE {WHERE_CLAUSE}");
    let total: i64 = sqlx::query_scalar(&count_query)
        .bind(filter.student_id)
        .bind(filter.payment_status.map(|s| s.as_str()))
        .bind(filter.stipend_class.map(|c| c.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub student_id: Option<Uuid>,
    pub stipend_id: Option<Uuid>,
    pub status: Option<TransferStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_transactions(
    pool: &PgPool,
    filter: &TransactionFilter,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<Transaction>, i64)> {
    const WHERE_CLAUSE: &str = r#"
        ($1::uuid IS NULL OR student_id = $1)
        AND ($2::uuid IS NULL OR stipend_id = $2)
        AND ($3::text IS NULL OR status = $3)
        AND ($4::timestamptz IS NULL OR initiated_at >= $4)
        AND ($5::timestamptz IS NULL OR initiated_at <= $5)
    "#;

    let query = format!(
        "SELECT * FROM transactions WHERE {WHERE_CLAUSE} ORDER BY initiated_at DESC LIMIT $6 OFFSET $7"
    );
    let rows = sqlx::query_as::<_, Transaction>(&query)
        .bind(filter.student_id)
        .bind(filter.stipend_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_query = format!("SELECT COUNT(*) FROM transactions WHERE {WHERE_CLAUSE}");
    let total: i64 = sqlx::query_scalar(&count_query)
        .bind(filter.student_id)
        .bind(filter.stipend_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

pub async fn list_all_deductions(
    pool: &PgPool,
    student_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<Deduction>, i64)> {
    let rows = sqlx::query_as::<_, Deduction>(
        r#"
        SELECT * FROM deductions
        WHERE ($1::uuid IS NULL OR student_id = $1)
        ORDER BY deduction_date DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM deductions WHERE ($1::uuid IS NULL OR student_id = $1)",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// One breakdown row per status within the window.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusTotal {
    pub status: String,
    pub count: i64,
    pub total_amount: BigDecimal,
}

pub async fn disbursement_summary(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> sqlx::Result<Vec<StatusTotal>> {
    sqlx::query_as::<_, StatusTotal>(
        r#"
        SELECT payment_status AS status,
               COUNT(*) AS count,
               COALESCE(SUM(amount), 0)::numeric(16,2) AS total_amount
        FROM stipends
        WHERE ($1::timestamptz IS NULL OR created_at >= $1)
          AND ($2::timestamptz IS NULL OR created_at <= $2)
        GROUP BY payment_status
        ORDER BY payment_status
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Deduction totals grouped by the type tag copied at application time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TypeTotal {
    pub type_tag: String,
    pub count: i64,
    pub total_amount: BigDecimal,
}

pub async fn deduction_summary(pool: &PgPool) -> sqlx::Result<Vec<TypeTotal>> {
    sqlx::query_as::<_, TypeTotal>(
        r#"
        SELECT type_tag,
               COUNT(*) AS count,
               COALESCE(SUM(amount), 0)::numeric(16,2) AS total_amount
        FROM deductions
        GROUP BY type_tag
        ORDER BY type_tag
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn transaction_summary(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> sqlx::Result<Vec<StatusTotal>> {
    sqlx::query_as::<_, StatusTotal>(
        r#"
        SELECT status,
               COUNT(*) AS count,
               COALESCE(SUM(amount), 0)::numeric(16,2) AS total_amount
        FROM transactions
        WHERE ($1::timestamptz IS NULL OR initiated_at >= $1)
          AND ($2::timestamptz IS NULL OR initiated_at <= $2)
        GROUP BY status
        ORDER BY status
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Export reads: full tables in a stable order, no pagination. The CSV
/// projection happens in `utils::csv`.
pub async fn export_stipends(pool: &PgPool) -> sqlx::Result<Vec<Stipend>> {
    sqlx::query_as::<_, Stipend>("SELECT * FROM stipends ORDER BY created_at ASC")
        .fetch_all(pool)
        .await
}

pub async fn export_deductions(pool: &PgPool) -> sqlx::Result<Vec<Deduction>> {
    sqlx::query_as::<_, Deduction>("SELECT * FROM deductions ORDER BY created_at ASC")
        .fetch_all(pool)
        .await
}

pub async fn export_transactions(pool: &PgPool) -> sqlx::Result<Vec<Transaction>> {
    sqlx::query_as::<_, Transaction>("SELECT * FROM transactions ORDER BY initiated_at ASC")
        .fetch_all(pool)
        .await
}
