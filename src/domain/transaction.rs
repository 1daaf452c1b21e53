//! Transaction domain entity: a settlement attempt against a stipend.
//! Status transitions are driven exclusively by the transfer engine.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// Transfer state machine:
///
/// ```text
/// PENDING --Process--> PROCESSING --ok--> SUCCESS (terminal)
///    |                     |
///    |                     +--fail--> FAILED --Retry--> PENDING
///    +--Cancel--> CANCELLED (terminal, also legal from PROCESSING)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Processing => "PROCESSING",
            TransferStatus::Success => "SUCCESS",
            TransferStatus::Failed => "FAILED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    /// SUCCESS and CANCELLED allow no further transition. FAILED stays
    /// open: the only way out is an operator retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Success | TransferStatus::Cancelled)
    }

    pub fn can_process(&self) -> bool {
        matches!(self, TransferStatus::Pending)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, TransferStatus::Pending | TransferStatus::Processing)
    }

    pub fn can_retry(&self) -> bool {
        matches!(self, TransferStatus::Failed)
    }
}

impl FromStr for TransferStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransferStatus::Pending),
            "PROCESSING" => Ok(TransferStatus::Processing),
            "SUCCESS" => Ok(TransferStatus::Success),
            "FAILED" => Ok(TransferStatus::Failed),
            "CANCELLED" => Ok(TransferStatus::Cancelled),
            other => Err(ParseEnumError::new("transfer status", other)),
        }
    }
}

impl TryFrom<String> for TransferStatus {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Stipend,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Stipend => "STIPEND",
            TransactionType::Refund => "REFUND",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STIPEND" => Ok(TransactionType::Stipend),
            "REFUND" => Ok(TransactionType::Refund),
            other => Err(ParseEnumError::new("transaction type", other)),
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub stipend_id: Uuid,
    pub student_id: Uuid,
    pub amount: BigDecimal,
    pub source_account: String,
    pub destination_account: String,
    pub destination_bank: String,
    #[sqlx(try_from = "String")]
    pub status: TransferStatus,
    pub payment_method: String,
    #[sqlx(try_from = "String")]
    pub transaction_type: TransactionType,
    pub reference_number: Option<String>,
    pub error_message: Option<String>,
    pub remarks: Option<String>,
    /// Oracle idempotency key is (stipend_id, attempt_sequence).
    pub attempt_sequence: i32,
    pub correlation_id: Option<Uuid>,
    pub initiated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stipend_id: Uuid,
        student_id: Uuid,
        amount: BigDecimal,
        source_account: String,
        destination_account: String,
        destination_bank: String,
        payment_method: String,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stipend_id,
            student_id,
            amount: amount.with_scale(2),
            source_account,
            destination_account,
            destination_bank,
            status: TransferStatus::Pending,
            payment_method,
            transaction_type,
            reference_number: None,
            error_message: None,
            remarks: None,
            attempt_sequence: 1,
            correlation_id: None,
            initiated_at: Utc::now(),
            processed_at: None,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            TransferStatus::Pending,
            TransferStatus::Processing,
            TransferStatus::Success,
            TransferStatus::Failed,
            TransferStatus::Cancelled,
        ] {
            assert_eq!(TransferStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(TransferStatus::from_str("pending").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Success.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
        assert!(!TransferStatus::Failed.is_terminal());
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(!TransferStatus::Processing.is_terminal());
    }

    #[test]
    fn test_transition_guards() {
        assert!(TransferStatus::Pending.can_process());
        assert!(!TransferStatus::Processing.can_process());
        assert!(TransferStatus::Pending.can_cancel());
        assert!(TransferStatus::Processing.can_cancel());
        assert!(!TransferStatus::Failed.can_cancel());
        assert!(TransferStatus::Failed.can_retry());
        assert!(!TransferStatus::Success.can_retry());
        assert!(!TransferStatus::Cancelled.can_retry());
    }

    #[test]
    fn test_new_transaction_defaults() {
        let tx = Transaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            bigdecimal::BigDecimal::from(4700),
            "UNIV-OPERATING".to_string(),
            "9912345678".to_string(),
            "FNB".to_string(),
            "BANK_TRANSFER".to_string(),
            TransactionType::Stipend,
        );

        assert_eq!(tx.status, TransferStatus::Pending);
        assert_eq!(tx.attempt_sequence, 1);
        assert!(tx.reference_number.is_none());
        assert!(tx.processed_at.is_none());
        assert!(tx.completed_at.is_none());
    }
}
