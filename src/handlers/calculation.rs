//! Read-only calculation endpoints. Nothing here writes; the same
//! calculator runs inside stipend creation.

use axum::{extract::State, response::IntoResponse, Json};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::rules;
use crate::domain::StipendClass;
use crate::error::AppError;
use crate::services::calculator;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CalculationRequest {
    pub student_id: Uuid,
    pub stipend_class: StipendClass,
    pub amount: BigDecimal,
}

async fn run(
    state: &AppState,
    request: &CalculationRequest,
    monthly: bool,
) -> Result<calculator::CalculationResult, AppError> {
    // Confirm the student exists before quoting numbers for them.
    state.students.get_student(request.student_id).await?;

    let ruleset = rules::list_applicable(&state.db, request.stipend_class).await?;

    let result = if monthly {
        calculator::calculate_monthly(request.stipend_class, &request.amount, &ruleset)?
    } else {
        calculator::calculate(request.stipend_class, &request.amount, &ruleset)?
    };
    Ok(result)
}

pub async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<CalculationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = run(&state, &request, false).await?;
    Ok(Json(result))
}

/// Divides the annual amount by 12 (two digits, sub-cent digits dropped)
/// before calculating.
pub async fn calculate_monthly(
    State(state): State<AppState>,
    Json(request): Json<CalculationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = run(&state, &request, true).await?;
    Ok(Json(result))
}

/// Annual passthrough; the amount is used as-is.
pub async fn calculate_annual(
    State(state): State<AppState>,
    Json(request): Json<CalculationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = run(&state, &request, false).await?;
    Ok(Json(result))
}
