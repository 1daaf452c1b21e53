//! Transfer engine HTTP surface.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::clients::Principal;
use crate::error::AppError;
use crate::middleware::{require_student_access, require_write_role};
use crate::utils::pagination::{Page, PageParams};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub stipend_id: Uuid,
    pub payment_method: String,
}

pub async fn initiate(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<InitiateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let transaction = state
        .transfer
        .initiate(
            request.stipend_id,
            request.payment_method,
            &principal.actor(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn process(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    let transaction = state.transfer.process(id, &principal.actor()).await?;
    Ok(Json(transaction))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    let transaction = state
        .transfer
        .cancel(id, &request.reason, &principal.actor())
        .await?;
    Ok(Json(transaction))
}

pub async fn retry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    let transaction = state.transfer.retry(id, &principal.actor()).await?;
    Ok(Json(transaction))
}

/// Get a transaction by id
#[utoipa::path(
    get,
    path = "/transfers/{id}",
    params(
        ("id" = String, Path, description = "Transaction id")
    ),
    responses(
        (status = 200, description = "Transaction found"),
        (status = 404, description = "Transaction not found")
    ),
    tag = "Transfers"
)]
pub async fn get_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state.transfer.get_status(id).await?;
    require_student_access(&principal, transaction.student_id)?;
    Ok(Json(transaction))
}

pub async fn list_by_stipend(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(stipend_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let stipend = state.ledger.get_stipend(stipend_id).await?;
    require_student_access(&principal, stipend.student_id)?;

    let transactions = state.transfer.list_by_stipend(stipend_id).await?;
    Ok(Json(transactions))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_by_student(
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
        .transfer
        .list_by_student(student_id, limit, offset)
        .await?;

    Ok(Json(Page {
        items,
        total,
        limit,
        offset,
    }))
}
