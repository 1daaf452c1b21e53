//! Applied deduction: one rule applied against one stipend. The type tag
//! and description are copied from the rule at application time.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Approved,
    Processed,
    Rejected,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Approved => "approved",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "approved" => Ok(ProcessingStatus::Approved),
            "processed" => Ok(ProcessingStatus::Processed),
            "rejected" => Ok(ProcessingStatus::Rejected),
            other => Err(ParseEnumError::new("processing status", other)),
        }
    }
}

impl TryFrom<String> for ProcessingStatus {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Deduction {
    pub id: Uuid,
    pub student_id: Uuid,
    pub stipend_id: Uuid,
    pub deduction_rule_id: Uuid,
    pub amount: BigDecimal,
    pub type_tag: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub processing_status: ProcessingStatus,
    pub approved_by: Option<Uuid>,
    pub approval_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub deduction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Deduction {
    pub fn new(
        student_id: Uuid,
        stipend_id: Uuid,
        deduction_rule_id: Uuid,
        amount: BigDecimal,
        type_tag: String,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id,
            stipend_id,
            deduction_rule_id,
            amount: amount.with_scale(2),
            type_tag,
            description,
            processing_status: ProcessingStatus::Pending,
            approved_by: None,
            approval_date: None,
            rejection_reason: None,
            deduction_date: now,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_status_roundtrip() {
        for status in [
            ProcessingStatus::Pending,
            ProcessingStatus::Approved,
            ProcessingStatus::Processed,
            ProcessingStatus::Rejected,
        ] {
            assert_eq!(
                ProcessingStatus::from_str(status.as_str()).unwrap(),
                status
            );
        }
        assert!(ProcessingStatus::from_str("declined").is_err());
    }

    #[test]
    fn test_new_deduction_is_pending() {
        let deduction = Deduction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            BigDecimal::from(3000),
            "hostel".to_string(),
            "Hostel accommodation".to_string(),
        );

        assert_eq!(deduction.processing_status, ProcessingStatus::Pending);
        assert!(deduction.approved_by.is_none());
        assert!(deduction.approval_date.is_none());
        assert!(deduction.rejection_reason.is_none());
    }
}
