pub mod audit;
pub mod deduction;
pub mod rule;
pub mod stipend;
pub mod transaction;

pub use audit::{AuditAction, AuditEvent, AuditOutcome};
pub use deduction::{Deduction, ProcessingStatus};
pub use rule::{Cadence, DeductionRule, NewRule, RulePatch};
pub use stipend::{NewStipend, PaymentStatus, Stipend, StipendClass};
pub use transaction::{Transaction, TransactionType, TransferStatus};

/// Error for wire/database strings that do not map onto a closed enum.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
