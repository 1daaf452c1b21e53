//! CSV export endpoints. Pure projections of committed state; nothing
//! locks and nothing writes.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};

use crate::clients::Principal;
use crate::db::read_model;
use crate::error::AppError;
use crate::middleware::require_write_role;
use crate::utils::csv as csv_util;
use crate::AppState;

fn csv_response(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn export_stipends(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, AppError> {
    require_write_role(&principal)?;

    let rows = read_model::export_stipends(&state.db).await?;
    let body = csv_util::to_csv(&csv_util::STIPEND_HEADERS, &rows, csv_util::stipend_record)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(csv_response("stipends.csv", body))
}

pub async fn export_deductions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, AppError> {
    require_write_role(&principal)?;

    let rows = read_model::export_deductions(&state.db).await?;
    let body = csv_util::to_csv(
        &csv_util::DEDUCTION_HEADERS,
        &rows,
        csv_util::deduction_record,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(csv_response("deductions.csv", body))
}

pub async fn export_transactions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, AppError> {
    require_write_role(&principal)?;

    let rows = read_model::export_transactions(&state.db).await?;
    let body = csv_util::to_csv(
        &csv_util::TRANSACTION_HEADERS,
        &rows,
        csv_util::transaction_record,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(csv_response("transactions.csv", body))
}
