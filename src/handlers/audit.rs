//! Audit trail reads. Back-office only; the trail itself has no write API.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::clients::Principal;
use crate::db::audit::{self, AuditFilter};
use crate::domain::{AuditAction, AuditOutcome};
use crate::error::AppError;
use crate::middleware::require_write_role;
use crate::utils::pagination::{Page, PageParams};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub actor: Option<String>,
    pub entity_kind: Option<String>,
    pub entity_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub outcome: Option<AuditOutcome>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let (limit, offset) = PageParams {
        limit: query.limit,
        offset: query.offset,
    }
    .clamp();

    let filter = AuditFilter {
        actor: query.actor,
        entity_kind: query.entity_kind,
        entity_id: query.entity_id,
        action: query.action,
        outcome: query.outcome,
        from: query.from,
        to: query.to,
    };

    let (items, total) = audit::list_events(&state.db, &filter, limit, offset).await?;

    Ok(Json(Page {
        items,
        total,
        limit,
        offset,
    }))
}

pub async fn events_for_entity(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;
    let events = audit::events_for_entity(&state.db, &kind, id).await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn events_by_actor(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(actor): Path<String>,
    Query(query): Query<ActorQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_write_role(&principal)?;

    let (limit, offset) = PageParams {
        limit: query.limit,
        offset: query.offset,
    }
    .clamp();

    let filter = AuditFilter {
        actor: Some(actor),
        ..AuditFilter::default()
    };
    let (items, total) = audit::list_events(&state.db, &filter, limit, offset).await?;

    Ok(Json(Page {
        items,
        total,
        limit,
        offset,
    }))
}
