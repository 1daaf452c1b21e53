use axum::{extract::State, response::IntoResponse, Json};

use crate::AppState;

/// Service health with per-dependency status
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health report", body = crate::health::HealthResponse)
    ),
    tag = "Operations"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health.check_all().await)
}
