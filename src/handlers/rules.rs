//! Rule store HTTP surface. Writes are back-office only and commit the
//! audit event in the same transaction as the rule change.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::clients::Principal;
use crate::db::{audit::AuditLog, rules};
use crate::domain::{audit::ENTITY_RULE, DeductionRule, NewRule, RulePatch, StipendClass};
use crate::error::AppError;
use crate::middleware::require_write_role;
use crate::services::validation;
use crate::utils::pagination::{Page, PageParams};
use crate::AppState;

pub async fn create_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<NewRule>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    validation::validate_rule(&input).into_result()?;

    let mut tx = state.db.begin().await?;

    if rules::name_exists(&mut *tx, &input.name, None).await? {
        return Err(AppError::DuplicateName(input.name));
    }

    let rule = DeductionRule::new(input, Some(principal.subject));
    let rule = rules::insert_rule(&mut tx, &rule).await?;

    AuditLog::log_creation(
        &mut tx,
        ENTITY_RULE,
        rule.id,
        serde_json::to_value(&rule).map_err(|e| AppError::Internal(e.to_string()))?,
        &principal.actor(),
        "deduction rule created",
    )
    .await?;

    tx.commit().await?;

    info!(rule_id = %rule.id, name = %rule.name, "deduction rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Get a deduction rule by id
#[utoipa::path(
    get,
    path = "/rules/{id}",
    params(
        ("id" = String, Path, description = "Rule id")
    ),
    responses(
        (status = 200, description = "Rule found"),
        (status = 404, description = "Rule not found")
    ),
    tag = "Rules"
)]
pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let rule = rules::get_rule(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rule {id}")))?;
    Ok(Json(rule))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(patch): Json<RulePatch>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let mut tx = state.db.begin().await?;

    let existing = rules::get_rule_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rule {id}")))?;

    let merged = patch.apply_to(&existing, Some(principal.subject));

    let as_input = NewRule {
        name: merged.name.clone(),
        type_tag: merged.type_tag.clone(),
        description: merged.description.clone(),
        base_amount: merged.base_amount.clone(),
        min_amount: merged.min_amount.clone(),
        max_amount: merged.max_amount.clone(),
        applies_to_full_scholar: merged.applies_to_full_scholar,
        applies_to_self_funded: merged.applies_to_self_funded,
        cadence: merged.cadence,
        is_optional: merged.is_optional,
        priority: merged.priority,
    };
    validation::validate_rule(&as_input).into_result()?;

    if merged.name != existing.name
        && rules::name_exists(&mut *tx, &merged.name, Some(id)).await?
    {
        return Err(AppError::DuplicateName(merged.name));
    }

    let updated = rules::update_rule(&mut tx, &merged).await?;

    AuditLog::log_update(
        &mut tx,
        ENTITY_RULE,
        id,
        serde_json::to_value(&existing).map_err(|e| AppError::Internal(e.to_string()))?,
        serde_json::to_value(&updated).map_err(|e| AppError::Internal(e.to_string()))?,
        &principal.actor(),
        "deduction rule updated",
    )
    .await?;

    tx.commit().await?;
    Ok(Json(updated))
}

/// Retiring an already-retired rule is an audited no-op.
pub async fn retire_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let mut tx = state.db.begin().await?;

    let existing = rules::get_rule_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rule {id}")))?;

    if !existing.is_active {
        let snapshot =
            serde_json::to_value(&existing).map_err(|e| AppError::Internal(e.to_string()))?;
        AuditLog::log_update(
            &mut tx,
            ENTITY_RULE,
            id,
            snapshot.clone(),
            snapshot,
            &principal.actor(),
            "rule already retired (no-op)",
        )
        .await?;
        tx.commit().await?;
        return Ok(Json(existing));
    }

    let updated = rules::set_active(&mut tx, id, false, Some(principal.subject))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rule {id}")))?;

    AuditLog::log_update(
        &mut tx,
        ENTITY_RULE,
        id,
        serde_json::to_value(&existing).map_err(|e| AppError::Internal(e.to_string()))?,
        serde_json::to_value(&updated).map_err(|e| AppError::Internal(e.to_string()))?,
        &principal.actor(),
        "deduction rule retired",
    )
    .await?;

    tx.commit().await?;

    info!(rule_id = %id, "deduction rule retired");
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ListRulesQuery {
    /// When present, lists the rules applicable to the class instead of
    /// every active rule.
    pub class: Option<StipendClass>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<ListRulesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = PageParams {
        limit: query.limit,
        offset: query.offset,
    }
    .clamp();

    let (items, total) = match query.class {
        Some(class) => {
            let rows = rules::list_applicable(&state.db, class).await?;
            let total = rows.len() as i64;
            (rows, total)
        }
        None => rules::list_active(&state.db, limit, offset).await?,
    };

    Ok(Json(Page {
        items,
        total,
        limit,
        offset,
    }))
}
