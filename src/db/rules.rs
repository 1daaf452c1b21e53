//! Rule store queries. Rules are authored rarely and read on every payout;
//! every listing uses the same deterministic ordering so calculations are
//! reproducible.

use sqlx::{PgExecutor, PgPool, Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use crate::domain::{DeductionRule, StipendClass};

pub async fn insert_rule(
    tx: &mut PgTransaction<'_, Postgres>,
    rule: &DeductionRule,
) -> sqlx::Result<DeductionRule> {
    sqlx::query_as::<_, DeductionRule>(
        r#"
        INSERT INTO deduction_rules (
            id, name, type_tag, description, base_amount, min_amount, max_amount,
            applies_to_full_scholar, applies_to_self_funded, cadence, is_optional,
            priority, is_active, created_by, modified_by, created_at, modified_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING *
        "#,
    )
    .bind(rule.id)
    .bind(&rule.name)
    .bind(&rule.type_tag)
    .bind(&rule.description)
    .bind(&rule.base_amount)
    .bind(&rule.min_amount)
    .bind(&rule.max_amount)
    .bind(rule.applies_to_full_scholar)
    .bind(rule.applies_to_self_funded)
    .bind(rule.cadence.as_str())
    .bind(rule.is_optional)
    .bind(rule.priority)
    .bind(rule.is_active)
    .bind(rule.created_by)
    .bind(rule.modified_by)
    .bind(rule.created_at)
    .bind(rule.modified_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn update_rule(
    tx: &mut PgTransaction<'_, Postgres>,
    rule: &DeductionRule,
) -> sqlx::Result<DeductionRule> {
    sqlx::query_as::<_, DeductionRule>(
        r#"
        UPDATE deduction_rules SET
            name = $2, type_tag = $3, description = $4, base_amount = $5,
            min_amount = $6, max_amount = $7, applies_to_full_scholar = $8,
            applies_to_self_funded = $9, cadence = $10, is_optional = $11,
            priority = $12, modified_by = $13, modified_at = $14
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(rule.id)
    .bind(&rule.name)
    .bind(&rule.type_tag)
    .bind(&rule.description)
    .bind(&rule.base_amount)
    .bind(&rule.min_amount)
    .bind(&rule.max_amount)
    .bind(rule.applies_to_full_scholar)
    .bind(rule.applies_to_self_funded)
    .bind(rule.cadence.as_str())
    .bind(rule.is_optional)
    .bind(rule.priority)
    .bind(rule.modified_by)
    .bind(rule.modified_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_rule<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<DeductionRule>> {
    sqlx::query_as::<_, DeductionRule>("SELECT * FROM deduction_rules WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_rule_for_update(
    tx: &mut PgTransaction<'_, Postgres>,
    id: Uuid,
) -> sqlx::Result<Option<DeductionRule>> {
    sqlx::query_as::<_, DeductionRule>("SELECT * FROM deduction_rules WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

/// Name uniqueness is case-sensitive and spans active and retired rows.
pub async fn name_exists<'e>(
    executor: impl PgExecutor<'e>,
    name: &str,
    exclude: Option<Uuid>,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM deduction_rules WHERE name = $1 AND ($2::uuid IS NULL OR id != $2)",
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(executor)
    .await?;
    Ok(count > 0)
}

/// Flips the soft-deletion flag; returns the previous row so callers can
/// detect the no-op case.
pub async fn set_active(
    tx: &mut PgTransaction<'_, Postgres>,
    id: Uuid,
    active: bool,
    modified_by: Option<Uuid>,
) -> sqlx::Result<Option<DeductionRule>> {
    sqlx::query_as::<_, DeductionRule>(
        r#"
        UPDATE deduction_rules
        SET is_active = $2, modified_by = $3, modified_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(active)
    .bind(modified_by)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn list_active(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<DeductionRule>, i64)> {
    let rows = sqlx::query_as::<_, DeductionRule>(
        r#"
        SELECT * FROM deduction_rules
        WHERE is_active
        ORDER BY priority DESC, name ASC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deduction_rules WHERE is_active")
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// Active rules whose applicability flag matches the stipend class, in
/// calculation order. Callers that need a consistent snapshot pass the
/// enclosing database transaction as the executor.
pub async fn list_applicable<'e>(
    executor: impl PgExecutor<'e>,
    class: StipendClass,
) -> sqlx::Result<Vec<DeductionRule>> {
    sqlx::query_as::<_, DeductionRule>(
        r#"
        SELECT * FROM deduction_rules
        WHERE is_active
          AND CASE WHEN $1 = 'full-scholarship'
                   THEN applies_to_full_scholar
                   ELSE applies_to_self_funded
              END
        ORDER BY priority DESC, name ASC
        "#,
    )
    .bind(class.as_str())
    .fetch_all(executor)
    .await
}
