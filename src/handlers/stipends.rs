//! Stipend ledger HTTP surface. Creation runs the calculator against the
//! current rule snapshot and commits the stipend with its deduction batch
//! as one unit of work.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::clients::Principal;
use crate::db::rules;
use crate::domain::{NewStipend, PaymentStatus};
use crate::error::AppError;
use crate::middleware::{require_student_access, require_write_role};
use crate::services::calculator;
use crate::utils::pagination::{Page, PageParams};
use crate::AppState;

pub async fn create_stipend(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<NewStipend>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let ruleset = rules::list_applicable(&state.db, input.stipend_class).await?;
    let result = calculator::calculate(input.stipend_class, &input.amount, &ruleset)?;

    let created = state
        .ledger
        .create_stipend(input, &result.applied, &principal.actor())
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a stipend by id
#[utoipa::path(
    get,
    path = "/stipends/{id}",
    params(
        ("id" = String, Path, description = "Stipend id")
    ),
    responses(
        (status = 200, description = "Stipend found"),
        (status = 404, description = "Stipend not found")
    ),
    tag = "Stipends"
)]
pub async fn get_stipend(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let stipend = state.ledger.get_stipend(id).await?;
    require_student_access(&principal, stipend.student_id)?;
    Ok(Json(stipend))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_for_student(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(student_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_student_access(&principal, student_id)?;
    let (limit, offset) = PageParams {
        limit: query.limit,
        offset: query.offset,
    }
    .clamp();

    let (items, total) = state
        .ledger
        .list_for_student(student_id, limit, offset)
        .await?;

    Ok(Json(Page {
        items,
        total,
        limit,
        offset,
    }))
}

pub async fn get_deductions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let stipend = state.ledger.get_stipend(id).await?;
    require_student_access(&principal, stipend.student_id)?;

    let deductions = state.ledger.list_deductions(id).await?;
    Ok(Json(deductions))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: PaymentStatus,
    pub when: Option<DateTime<Utc>>,
}

pub async fn set_payment_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let stipend = state
        .ledger
        .set_payment_status(id, request.status, request.when, &principal.actor())
        .await?;

    Ok(Json(stipend))
}

#[derive(Debug, Deserialize)]
pub struct DeclineRetryRequest {
    pub reason: String,
}

/// Operator declines to retry the stipend's failed transaction; the
/// stipend becomes Failed.
pub async fn decline_retry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<DeclineRetryRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let stipend = state
        .ledger
        .decline_retry(id, &request.reason, &principal.actor())
        .await?;

    Ok(Json(stipend))
}
