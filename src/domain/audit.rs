//! Audit event entity. Rows are append-only; nothing in the application
//! mutates them after the insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

pub const ENTITY_RULE: &str = "deduction_rule";
pub const ENTITY_STIPEND: &str = "stipend";
pub const ENTITY_DEDUCTION: &str = "deduction";
pub const ENTITY_TRANSACTION: &str = "transaction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::View => "VIEW",
        }
    }
}

impl FromStr for AuditAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(AuditAction::Create),
            "UPDATE" => Ok(AuditAction::Update),
            "DELETE" => Ok(AuditAction::Delete),
            "VIEW" => Ok(AuditAction::View),
            other => Err(ParseEnumError::new("audit action", other)),
        }
    }
}

impl TryFrom<String> for AuditAction {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditOutcome {
    Success,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Failed => "FAILED",
        }
    }
}

impl FromStr for AuditOutcome {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(AuditOutcome::Success),
            "FAILED" => Ok(AuditOutcome::Failed),
            other => Err(ParseEnumError::new("audit outcome", other)),
        }
    }
}

impl TryFrom<String> for AuditOutcome {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEvent {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub action: AuditAction,
    pub entity_kind: String,
    pub entity_id: Uuid,
    pub actor: String,
    pub description: String,
    pub old_snapshot: Option<serde_json::Value>,
    pub new_snapshot: Option<serde_json::Value>,
    #[sqlx(try_from = "String")]
    pub outcome: AuditOutcome,
    pub error_text: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::View,
        ] {
            assert_eq!(AuditAction::from_str(action.as_str()).unwrap(), action);
        }
        assert!(AuditAction::from_str("create").is_err());
    }

    #[test]
    fn test_outcome_roundtrip() {
        assert_eq!(
            AuditOutcome::from_str("SUCCESS").unwrap(),
            AuditOutcome::Success
        );
        assert_eq!(
            AuditOutcome::from_str("FAILED").unwrap(),
            AuditOutcome::Failed
        );
        assert!(AuditOutcome::from_str("ok").is_err());
    }
}
