//! Stipend domain entity: an authorised payout intent.
//! Amount and class are immutable after creation.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StipendClass {
    FullScholarship,
    SelfFunded,
    Partial,
}

impl StipendClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StipendClass::FullScholarship => "full-scholarship",
            StipendClass::SelfFunded => "self-funded",
            StipendClass::Partial => "partial",
        }
    }
}

impl FromStr for StipendClass {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-scholarship" => Ok(StipendClass::FullScholarship),
            "self-funded" => Ok(StipendClass::SelfFunded),
            "partial" => Ok(StipendClass::Partial),
            other => Err(ParseEnumError::new("stipend class", other)),
        }
    }
}

impl TryFrom<String> for StipendClass {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Payment status of a stipend, distinct from the transaction status.
/// Processed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processed => "processed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Processed | PaymentStatus::Failed)
    }

    /// Legal transitions: Pending -> Processed, Pending -> Failed.
    /// Self-loops are tolerated no-ops handled by the ledger.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (
                PaymentStatus::Pending,
                PaymentStatus::Processed | PaymentStatus::Failed
            )
        )
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "processed" => Ok(PaymentStatus::Processed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ParseEnumError::new("payment status", other)),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Stipend {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: BigDecimal,
    #[sqlx(try_from = "String")]
    pub stipend_class: StipendClass,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub journal_number: String,
    pub notes: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub linked_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Stipend {
    pub fn new(
        student_id: Uuid,
        stipend_class: StipendClass,
        amount: BigDecimal,
        payment_method: String,
        journal_number: String,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id,
            amount: amount.with_scale(2),
            stipend_class,
            payment_status: PaymentStatus::Pending,
            payment_method,
            journal_number,
            notes,
            payment_date: None,
            linked_transaction_id: None,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Request payload for creating a stipend.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStipend {
    pub student_id: Uuid,
    pub stipend_class: StipendClass,
    pub amount: BigDecimal,
    pub payment_method: String,
    pub journal_number: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn test_class_roundtrip() {
        for class in [
            StipendClass::FullScholarship,
            StipendClass::SelfFunded,
            StipendClass::Partial,
        ] {
            assert_eq!(StipendClass::from_str(class.as_str()).unwrap(), class);
        }
        assert!(StipendClass::from_str("half-scholarship").is_err());
    }

    #[test]
    fn test_payment_status_machine() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Processed));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Processed.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Processed));
        assert!(PaymentStatus::Processed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }

    #[test]
    fn test_new_stipend_defaults() {
        let stipend = Stipend::new(
            Uuid::new_v4(),
            StipendClass::SelfFunded,
            BigDecimal::from_str("5000").unwrap(),
            "BANK_TRANSFER".to_string(),
            "JN-001".to_string(),
            None,
        );

        assert_eq!(stipend.payment_status, PaymentStatus::Pending);
        assert_eq!(stipend.amount, BigDecimal::from_str("5000.00").unwrap());
        assert!(stipend.payment_date.is_none());
        assert!(stipend.linked_transaction_id.is_none());
        assert!(stipend.created_at <= Utc::now());
    }
}
