use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate rule name: {0}")]
    DuplicateName(String),
    #[error("Duplicate journal number: {0}")]
    DuplicateJournal(String),
    #[error("Illegal state: {0}")]
    IllegalState(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Unique-constraint violations can slip past the pre-insert existence
/// checks under concurrency; they map back to the duplicate errors the
/// checks would have produced instead of surfacing as 500s.
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        let constraint = match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                db.constraint().map(str::to_owned)
            }
            _ => None,
        };
        match constraint.as_deref() {
            Some("stipends_journal_number_key") => {
                AppError::DuplicateJournal("journal number already in use".to_string())
            }
            Some("deduction_rules_name_key") => {
                AppError::DuplicateName("rule name already in use".to_string())
            }
            _ => AppError::Database(e),
        }
    }
}

impl AppError {
    /// Stable kind tag exposed on the wire alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::DuplicateName(_) => "duplicate_name",
            AppError::DuplicateJournal(_) => "duplicate_journal",
            AppError::IllegalState(_) => "illegal_state",
            AppError::InvariantViolation(_) => "invariant_violation",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Upstream(_) => "upstream",
            AppError::Timeout(_) => "timeout",
            AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateName(_)
            | AppError::DuplicateJournal(_)
            | AppError::IllegalState(_)
            | AppError::InvariantViolation(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal failures are logged with full context and surfaced with a
        // correlation id instead of the underlying message.
        let message = match &self {
            AppError::Database(e) => {
                let correlation_id = Uuid::new_v4();
                tracing::error!(%correlation_id, error = %e, "database error");
                format!("internal error, correlation id {correlation_id}")
            }
            AppError::Internal(msg) => {
                let correlation_id = Uuid::new_v4();
                tracing::error!(%correlation_id, error = %msg, "internal error");
                format!("internal error, correlation id {correlation_id}")
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DuplicateJournal("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::IllegalState("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Timeout("x".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::Upstream("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(
            AppError::InvariantViolation("x".into()).kind(),
            "invariant_violation"
        );
        assert_eq!(AppError::Internal("x".into()).kind(), "internal");
    }
}
