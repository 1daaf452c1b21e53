//! Report summaries over the read model.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::clients::Principal;
use crate::db::read_model;
use crate::error::AppError;
use crate::middleware::require_write_role;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Stipend counts and totals by payment status over a time window
#[utoipa::path(
    get,
    path = "/reports/disbursements",
    params(
        ("from" = Option<String>, Query, description = "Window start (RFC-3339)"),
        ("to" = Option<String>, Query, description = "Window end (RFC-3339)")
    ),
    responses(
        (status = 200, description = "Summary rows")
    ),
    tag = "Reports"
)]
pub async fn disbursement_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(window): Query<WindowQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    let rows = read_model::disbursement_summary(&state.db, window.from, window.to).await?;
    Ok(Json(rows))
}

pub async fn deduction_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    let rows = read_model::deduction_summary(&state.db).await?;
    Ok(Json(rows))
}

pub async fn transaction_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(window): Query<WindowQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    let rows = read_model::transaction_summary(&state.db, window.from, window.to).await?;
    Ok(Json(rows))
}
