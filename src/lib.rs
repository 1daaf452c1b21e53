pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::clients::{IdentityVerifier, StudentDirectory};
use crate::health::HealthChecker;
use crate::services::{Ledger, TransferEngine};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub ledger: Ledger,
    pub transfer: Arc<TransferEngine>,
    pub students: Arc<dyn StudentDirectory>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub health: Arc<HealthChecker>,
}

/// Builds the CORS layer from the configured origin list; an absent list
/// means a permissive development posture.
fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    match allowed_origins {
        Some(origins) => {
            let parsed: Vec<axum::http::HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

pub fn create_app(state: AppState, allowed_origins: Option<&str>) -> Router {
    let authed = Router::new()
        .route("/rules", post(handlers::rules::create_rule).get(handlers::rules::list_rules))
        .route(
            "/rules/:id",
            get(handlers::rules::get_rule).put(handlers::rules::update_rule),
        )
        .route("/rules/:id/retire", put(handlers::rules::retire_rule))
        .route("/stipends", post(handlers::stipends::create_stipend))
        .route("/stipends/:id", get(handlers::stipends::get_stipend))
        .route(
            "/stipends/:id/deductions",
            get(handlers::stipends::get_deductions),
        )
        .route(
            "/stipends/:id/status",
            put(handlers::stipends::set_payment_status),
        )
        .route(
            "/stipends/:id/decline-retry",
            post(handlers::stipends::decline_retry),
        )
        .route(
            "/stipends/:id/transfers",
            get(handlers::transfers::list_by_stipend),
        )
        .route(
            "/students/:id/stipends",
            get(handlers::stipends::list_for_student),
        )
        .route(
            "/students/:id/transactions",
            get(handlers::transfers::list_by_student),
        )
        .route("/calculate", post(handlers::calculation::calculate))
        .route(
            "/calculate/monthly",
            post(handlers::calculation::calculate_monthly),
        )
        .route(
            "/calculate/annual",
            post(handlers::calculation::calculate_annual),
        )
        .route("/transfers", post(handlers::transfers::initiate))
        .route("/transfers/:id", get(handlers::transfers::get_status))
        .route("/transfers/:id/process", post(handlers::transfers::process))
        .route("/transfers/:id/cancel", post(handlers::transfers::cancel))
        .route("/transfers/:id/retry", post(handlers::transfers::retry))
        .route("/audit", get(handlers::audit::list_events))
        .route(
            "/audit/actor/:actor",
            get(handlers::audit::events_by_actor),
        )
        .route(
            "/audit/:kind/:id",
            get(handlers::audit::events_for_entity),
        )
        .route(
            "/reports/disbursements",
            get(handlers::reports::disbursement_summary),
        )
        .route(
            "/reports/deductions",
            get(handlers::reports::deduction_summary),
        )
        .route(
            "/reports/transactions",
            get(handlers::reports::transaction_summary),
        )
        .route("/export/stipends.csv", get(handlers::export::export_stipends))
        .route(
            "/export/deductions.csv",
            get(handlers::export::export_deductions),
        )
        .route(
            "/export/transactions.csv",
            get(handlers::export::export_transactions),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(authed)
        .layer(from_fn(middleware::request_logger_middleware))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}
