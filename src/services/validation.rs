//! Pure validation over rule and stipend inputs. Runs before any write;
//! produces a report with hard errors and advisory warnings, never touches
//! the database.

use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;

use crate::domain::{NewRule, NewStipend};
use crate::error::AppError;

pub const MIN_AMOUNT: u64 = 0;
pub const MAX_STIPEND: u64 = 10_000_000;
pub const MAX_DEDUCTION_PER_RULE: u64 = 100_000_000;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TYPE_TAG_LEN: usize = 100;
pub const MAX_DESC_LEN: usize = 5000;
pub const MAX_JOURNAL_LEN: usize = 255;
/// Warn when total deductions exceed this share of the base amount.
pub const DEDUCTION_WARNING_RATIO: f64 = 0.80;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Converts a failed report into the error the caller propagates.
    pub fn into_result(self) -> Result<Vec<String>, AppError> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(AppError::InvalidInput(self.errors.join("; ")))
        }
    }
}

pub fn validate_rule(input: &NewRule) -> ValidationReport {
    let mut report = ValidationReport::new();

    if input.name.trim().is_empty() {
        report.error("rule name must not be empty");
    }
    if input.name.chars().count() > MAX_NAME_LEN {
        report.error(format!("rule name exceeds {MAX_NAME_LEN} characters"));
    }
    if input.type_tag.trim().is_empty() {
        report.error("type tag must not be empty");
    }
    if input.type_tag.chars().count() > MAX_TYPE_TAG_LEN {
        report.error(format!("type tag exceeds {MAX_TYPE_TAG_LEN} characters"));
    }
    if input.description.chars().count() > MAX_DESC_LEN {
        report.error(format!("description exceeds {MAX_DESC_LEN} characters"));
    }

    if input.min_amount < BigDecimal::from(MIN_AMOUNT) {
        report.error("min amount must not be negative");
    }
    if input.base_amount < input.min_amount {
        report.error("base amount must not be below min amount");
    }
    if input.max_amount < input.base_amount {
        report.error("max amount must not be below base amount");
    }
    if input.max_amount > BigDecimal::from(MAX_DEDUCTION_PER_RULE) {
        report.error(format!("max amount exceeds limit of {MAX_DEDUCTION_PER_RULE}"));
    }
    if input.base_amount > BigDecimal::from(MAX_STIPEND) {
        report.error(format!("base amount exceeds limit of {MAX_STIPEND}"));
    }

    if !input.applies_to_full_scholar && !input.applies_to_self_funded {
        report.error("rule must apply to at least one stipend class");
    }

    report
}

pub fn validate_stipend(input: &NewStipend) -> ValidationReport {
    let mut report = ValidationReport::new();

    if input.amount <= BigDecimal::zero() {
        report.error("stipend amount must be positive");
    }
    if input.amount > BigDecimal::from(MAX_STIPEND) {
        report.error(format!("stipend amount exceeds limit of {MAX_STIPEND}"));
    }
    if input.payment_method.trim().is_empty() {
        report.error("payment method must not be empty");
    }
    if input.journal_number.trim().is_empty() {
        report.error("journal number must not be empty");
    }
    if input.journal_number.chars().count() > MAX_JOURNAL_LEN {
        report.error(format!("journal number exceeds {MAX_JOURNAL_LEN} characters"));
    }

    report
}

/// Checks a deduction batch against what the stipend can still carry.
/// `existing` is the sum of previously persisted deductions for the stipend.
pub fn validate_deduction_batch(
    stipend_amount: &BigDecimal,
    existing: &BigDecimal,
    batch: &BigDecimal,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    if batch < &BigDecimal::zero() {
        report.error("deduction batch total must not be negative");
    }

    let total = existing + batch;
    if &total > stipend_amount {
        report.error(format!(
            "deductions {total} would exceed stipend amount {stipend_amount}"
        ));
        return report;
    }

    // Exact integer arithmetic; 0.80 expressed as 80/100.
    let ratio_limit = stipend_amount * BigDecimal::from(80u32) / BigDecimal::from(100u32);
    if total > ratio_limit {
        report.warn(format!(
            "deductions {total} exceed {:.0}% of the stipend amount",
            DEDUCTION_WARNING_RATIO * 100.0
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cadence, StipendClass};
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn valid_rule() -> NewRule {
        NewRule {
            name: "Hostel".to_string(),
            type_tag: "hostel".to_string(),
            description: "Hostel accommodation".to_string(),
            base_amount: dec("3000"),
            min_amount: dec("2500"),
            max_amount: dec("3500"),
            applies_to_full_scholar: true,
            applies_to_self_funded: false,
            cadence: Cadence::Monthly,
            is_optional: false,
            priority: 100,
        }
    }

    fn valid_stipend() -> NewStipend {
        NewStipend {
            student_id: Uuid::new_v4(),
            stipend_class: StipendClass::SelfFunded,
            amount: dec("5000"),
            payment_method: "BANK_TRANSFER".to_string(),
            journal_number: "JN-001".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_valid_rule_passes() {
        let report = validate_rule(&valid_rule());
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_rule_rejects_empty_name() {
        let mut input = valid_rule();
        input.name = "   ".to_string();
        assert!(!validate_rule(&input).valid);
    }

    #[test]
    fn test_rule_rejects_overlong_name() {
        let mut input = valid_rule();
        input.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(!validate_rule(&input).valid);
    }

    #[test]
    fn test_name_limit_counts_chars_not_bytes() {
        // Two bytes per char in UTF-8; exactly at the limit must pass.
        let mut input = valid_rule();
        input.name = "é".repeat(MAX_NAME_LEN);
        assert!(validate_rule(&input).valid);

        input.name = "é".repeat(MAX_NAME_LEN + 1);
        assert!(!validate_rule(&input).valid);
    }

    #[test]
    fn test_rule_rejects_broken_amount_ladder() {
        let mut input = valid_rule();
        input.min_amount = dec("4000");
        let report = validate_rule(&input);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("base amount must not be below min")));
    }

    #[test]
    fn test_rule_rejects_negative_min() {
        let mut input = valid_rule();
        input.min_amount = dec("-1");
        assert!(!validate_rule(&input).valid);
    }

    #[test]
    fn test_rule_rejects_excessive_max() {
        let mut input = valid_rule();
        input.base_amount = dec("100000001");
        input.max_amount = dec("100000001");
        assert!(!validate_rule(&input).valid);
    }

    #[test]
    fn test_rule_requires_an_applicability_flag() {
        let mut input = valid_rule();
        input.applies_to_full_scholar = false;
        input.applies_to_self_funded = false;
        assert!(!validate_rule(&input).valid);
    }

    #[test]
    fn test_valid_stipend_passes() {
        assert!(validate_stipend(&valid_stipend()).valid);
    }

    #[test]
    fn test_stipend_rejects_zero_and_negative_amount() {
        let mut input = valid_stipend();
        input.amount = dec("0");
        assert!(!validate_stipend(&input).valid);
        input.amount = dec("-50");
        assert!(!validate_stipend(&input).valid);
    }

    #[test]
    fn test_stipend_rejects_blank_journal() {
        let mut input = valid_stipend();
        input.journal_number = "".to_string();
        assert!(!validate_stipend(&input).valid);
    }

    #[test]
    fn test_batch_within_stipend_passes() {
        let report = validate_deduction_batch(&dec("5000"), &dec("1000"), &dec("2000"));
        assert!(report.valid);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_batch_exceeding_stipend_fails() {
        let report = validate_deduction_batch(&dec("5000"), &dec("3000"), &dec("2500"));
        assert!(!report.valid);
    }

    #[test]
    fn test_batch_above_warning_ratio_warns() {
        let report = validate_deduction_batch(&dec("5000"), &dec("0"), &dec("4500"));
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("80%"));
    }

    #[test]
    fn test_into_result_propagates_invalid_input() {
        let mut input = valid_stipend();
        input.amount = dec("0");
        let err = validate_stipend(&input).into_result().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
