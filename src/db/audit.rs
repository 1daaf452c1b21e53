//! Append-only audit trail. Writers record events inside the same database
//! transaction as the business write; there is no update or delete path.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use crate::domain::{AuditAction, AuditEvent, AuditOutcome};

pub struct AuditLog;

impl AuditLog {
    #[allow(clippy::too_many_arguments)]
    async fn record(
        tx: &mut PgTransaction<'_, Postgres>,
        action: AuditAction,
        entity_kind: &str,
        entity_id: Uuid,
        actor: &str,
        description: &str,
        old_snapshot: Option<Value>,
        new_snapshot: Option<Value>,
        outcome: AuditOutcome,
        error_text: Option<&str>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                id, action, entity_kind, entity_id, actor, description,
                old_snapshot, new_snapshot, outcome, error_text, occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(action.as_str())
        .bind(entity_kind)
        .bind(entity_id)
        .bind(actor)
        .bind(description)
        .bind(old_snapshot)
        .bind(new_snapshot)
        .bind(outcome.as_str())
        .bind(error_text)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// CREATE: no old snapshot, new snapshot present.
    pub async fn log_creation(
        tx: &mut PgTransaction<'_, Postgres>,
        entity_kind: &str,
        entity_id: Uuid,
        new_snapshot: Value,
        actor: &str,
        description: &str,
    ) -> sqlx::Result<()> {
        Self::record(
            tx,
            AuditAction::Create,
            entity_kind,
            entity_id,
            actor,
            description,
            None,
            Some(new_snapshot),
            AuditOutcome::Success,
            None,
        )
        .await
    }

    /// UPDATE: both snapshots present.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_update(
        tx: &mut PgTransaction<'_, Postgres>,
        entity_kind: &str,
        entity_id: Uuid,
        old_snapshot: Value,
        new_snapshot: Value,
        actor: &str,
        description: &str,
    ) -> sqlx::Result<()> {
        Self::record(
            tx,
            AuditAction::Update,
            entity_kind,
            entity_id,
            actor,
            description,
            Some(old_snapshot),
            Some(new_snapshot),
            AuditOutcome::Success,
            None,
        )
        .await
    }

    /// A write that was attempted and failed; snapshots reflect the state
    /// the writer observed before giving up.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_failed(
        tx: &mut PgTransaction<'_, Postgres>,
        action: AuditAction,
        entity_kind: &str,
        entity_id: Uuid,
        old_snapshot: Option<Value>,
        actor: &str,
        error_text: &str,
    ) -> sqlx::Result<()> {
        Self::record(
            tx,
            action,
            entity_kind,
            entity_id,
            actor,
            "write failed",
            old_snapshot,
            None,
            AuditOutcome::Failed,
            Some(error_text),
        )
        .await
    }
}

/// Filter for audit queries; all fields optional and AND-combined.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub entity_kind: Option<String>,
    pub entity_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub outcome: Option<AuditOutcome>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_events(
    pool: &PgPool,
    filter: &AuditFilter,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<AuditEvent>, i64)> {
    const WHERE_CLAUSE: &str = r#"
        ($1::text IS NULL OR actor = $1)
        AND ($2::text IS NULL OR entity_kind = $2)
        AND ($3::uuid IS NULL OR entity_id = $3)
        AND ($4::text IS NULL OR action = $4)
        AND ($5::text IS NULL OR outcome = $5)
        AND ($6::timestamptz IS NULL OR occurred_at >= $6)
        AND ($7::timestamptz IS NULL OR occurred_at <= $7)
    "#;

    let query = format!(
        "SELECT * FROM audit_events WHERE {WHERE_CLAUSE} ORDER BY occurred_at DESC LIMIT $8 OFFSET $9"
    );
    let rows = sqlx::query_as::<_, AuditEvent>(&query)
        .bind(&filter.actor)
        .bind(&filter.entity_kind)
        .bind(filter.entity_id)
        .bind(filter.action.map(|a| a.as_str()))
        .bind(filter.outcome.map(|o| o.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_query = format!("SELECT COUNT(*) FROM audit_events WHERE {WHERE_CLAUSE}");
    let total: i64 = sqlx::query_scalar(&count_query)
        .bind(&filter.actor)
        .bind(&filter.entity_kind)
        .bind(filter.entity_id)
        .bind(filter.action.map(|a| a.as_str()))
        .bind(filter.outcome.map(|o| o.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// Full history of one entity, oldest first.
pub async fn events_for_entity(
    pool: &PgPool,
    entity_kind: &str,
    entity_id: Uuid,
) -> sqlx::Result<Vec<AuditEvent>> {
    sqlx::query_as::<_, AuditEvent>(
        r#"
        SELECT * FROM audit_events
        WHERE entity_kind = $1 AND entity_id = $2
        ORDER BY occurred_at ASC
        "#,
    )
    .bind(entity_kind)
    .bind(entity_id)
    .fetch_all(pool)
    .await
}
