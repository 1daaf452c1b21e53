//! Bearer-token authentication. The identity collaborator turns the token
//! into a `Principal` which is stored in request extensions for handlers
//! and role guards.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::clients::{Principal, Role};
use crate::error::AppError;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    let principal = state
        .identity
        .verify(token)
        .await
        .map_err(|_| AppError::Unauthorized("bearer token rejected".to_string()))?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Writes require a back-office role.
pub fn require_write_role(principal: &Principal) -> Result<(), AppError> {
    if principal.role.can_write() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role {} may not write",
            principal.role.as_str()
        )))
    }
}

/// Students may only read their own records; back-office roles see all.
pub fn require_student_access(principal: &Principal, student_id: Uuid) -> Result<(), AppError> {
    match principal.role {
        Role::Admin | Role::FinanceOfficer => Ok(()),
        Role::Student if principal.subject == student_id => Ok(()),
        Role::Student => Err(AppError::Forbidden(
            "students may only read their own stipends".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            subject: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_write_roles() {
        assert!(require_write_role(&principal(Role::Admin)).is_ok());
        assert!(require_write_role(&principal(Role::FinanceOfficer)).is_ok());
        assert!(require_write_role(&principal(Role::Student)).is_err());
    }

    #[test]
    fn test_student_reads_own_records_only() {
        let own = principal(Role::Student);
        assert!(require_student_access(&own, own.subject).is_ok());
        assert!(require_student_access(&own, Uuid::new_v4()).is_err());
        assert!(require_student_access(&principal(Role::FinanceOfficer), Uuid::new_v4()).is_ok());
    }
}
