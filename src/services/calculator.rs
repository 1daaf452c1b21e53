//! Stipend calculation engine.
//!
//! Pure: no writes, no clock, no I/O. Given a stipend class, a base amount
//! and a rule set, it produces the net amount and the ordered list of
//! applied deductions. Calling it twice with the same inputs returns the
//! same result.

use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{DeductionRule, StipendClass};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("base amount must be positive, got {0}")]
    NonPositiveBase(BigDecimal),

    #[error("rule {0} is not usable for this calculation (inactive or not applicable)")]
    UnusableRule(String),
}

impl From<CalcError> for AppError {
    fn from(e: CalcError) -> Self {
        match e {
            CalcError::NonPositiveBase(_) => AppError::InvalidInput(e.to_string()),
            CalcError::UnusableRule(_) => AppError::InvalidInput(e.to_string()),
        }
    }
}

/// One rule applied against the base amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedDeduction {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub type_tag: String,
    pub amount: BigDecimal,
    pub description: String,
    pub is_optional: bool,
    /// True when the entry carries zero amount because the stipend was
    /// already exhausted when the rule's turn came.
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub base_amount: BigDecimal,
    pub total_deductions: BigDecimal,
    pub net_amount: BigDecimal,
    pub applied: Vec<AppliedDeduction>,
}

/// Clamp the rule's base amount into its [min, max] window. This strict
/// clamp runs before the remaining-stipend cap, never after.
fn clamp(rule: &DeductionRule) -> BigDecimal {
    let candidate = rule.base_amount.clone();
    if candidate < rule.min_amount {
        rule.min_amount.clone()
    } else if candidate > rule.max_amount {
        rule.max_amount.clone()
    } else {
        candidate
    }
}

/// Calculates net stipend for `class` over `base_amount` using `rules`.
///
/// The caller supplies the rule snapshot (usually
/// `db::rules::list_applicable`); every rule must be active and applicable
/// to the class. Rules are applied in Priority DESC, Name ASC order so that
/// high-priority rules are paid first when the stipend is tight.
pub fn calculate(
    class: StipendClass,
    base_amount: &BigDecimal,
    rules: &[DeductionRule],
) -> Result<CalculationResult, CalcError> {
    if base_amount <= &BigDecimal::zero() {
        return Err(CalcError::NonPositiveBase(base_amount.clone()));
    }
    let base_amount = base_amount.with_scale(2);

    for rule in rules {
        if !rule.is_active || !rule.applies_to(class) {
            return Err(CalcError::UnusableRule(rule.name.clone()));
        }
    }

    let mut ordered: Vec<&DeductionRule> = rules.iter().collect();
    ordered.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut remaining = base_amount.clone();
    let mut applied = Vec::with_capacity(ordered.len());

    for rule in ordered {
        if remaining.is_zero() {
            // Exhausted: mandatory rules still leave a zero-amount marker so
            // the shortfall is observable in the audit trail; optional rules
            // are simply omitted.
            if !rule.is_optional {
                applied.push(AppliedDeduction {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    type_tag: rule.type_tag.clone(),
                    amount: BigDecimal::zero().with_scale(2),
                    description: rule.description.clone(),
                    is_optional: rule.is_optional,
                    skipped: true,
                });
            }
            continue;
        }

        let mut amount = clamp(rule).with_scale(2);
        if amount > remaining {
            amount = remaining.clone();
        }

        remaining -= &amount;
        applied.push(AppliedDeduction {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            type_tag: rule.type_tag.clone(),
            amount,
            description: rule.description.clone(),
            is_optional: rule.is_optional,
            skipped: false,
        });
    }

    let total_deductions = (&base_amount - &remaining).with_scale(2);
    Ok(CalculationResult {
        base_amount,
        total_deductions,
        net_amount: remaining.with_scale(2),
        applied,
    })
}

/// Divides an annual amount into a monthly base (two digits, extra digits
/// dropped) and delegates to [`calculate`].
pub fn calculate_monthly(
    class: StipendClass,
    annual_amount: &BigDecimal,
    rules: &[DeductionRule],
) -> Result<CalculationResult, CalcError> {
    if annual_amount <= &BigDecimal::zero() {
        return Err(CalcError::NonPositiveBase(annual_amount.clone()));
    }
    let monthly = (annual_amount / BigDecimal::from(12)).with_scale(2);
    calculate(class, &monthly, rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cadence, NewRule};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap().with_scale(2)
    }

    fn rule(name: &str, base: &str, min: &str, max: &str, priority: i32) -> DeductionRule {
        DeductionRule::new(
            NewRule {
                name: name.to_string(),
                type_tag: name.to_lowercase(),
                description: format!("{name} fee"),
                base_amount: dec(base),
                min_amount: dec(min),
                max_amount: dec(max),
                applies_to_full_scholar: true,
                applies_to_self_funded: true,
                cadence: Cadence::Monthly,
                is_optional: false,
                priority,
            },
            None,
        )
    }

    #[test]
    fn test_single_rule_within_window() {
        // Spec scenario S1.
        let hostel = rule("Hostel", "3000", "2500", "3500", 100);
        let result =
            calculate(StipendClass::FullScholarship, &dec("50000"), &[hostel]).unwrap();

        assert_eq!(result.base_amount, dec("50000"));
        assert_eq!(result.total_deductions, dec("3000"));
        assert_eq!(result.net_amount, dec("47000"));
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.applied[0].rule_name, "Hostel");
        assert_eq!(result.applied[0].amount, dec("3000"));
        assert!(!result.applied[0].skipped);
    }

    #[test]
    fn test_low_priority_rule_capped_to_remaining() {
        // Spec scenario S2: B is capped to what is left after A.
        let a = rule("A", "4000", "0", "4000", 100);
        let b = rule("B", "3000", "0", "3000", 1);
        let result = calculate(StipendClass::SelfFunded, &dec("5000"), &[b, a]).unwrap();

        assert_eq!(result.total_deductions, dec("5000"));
        assert_eq!(result.net_amount, dec("0"));
        assert_eq!(result.applied.len(), 2);
        assert_eq!(result.applied[0].rule_name, "A");
        assert_eq!(result.applied[0].amount, dec("4000"));
        assert_eq!(result.applied[1].rule_name, "B");
        assert_eq!(result.applied[1].amount, dec("1000"));
    }

    #[test]
    fn test_priority_ties_break_by_name() {
        let zeta = rule("Zeta", "100", "0", "100", 10);
        let alpha = rule("Alpha", "100", "0", "100", 10);
        let result = calculate(StipendClass::SelfFunded, &dec("1000"), &[zeta, alpha]).unwrap();

        assert_eq!(result.applied[0].rule_name, "Alpha");
        assert_eq!(result.applied[1].rule_name, "Zeta");
    }

    #[test]
    fn test_min_clamp_raises_candidate() {
        // Base below Min: the strict clamp lifts the amount to Min.
        let r = rule("Mess", "2000", "2500", "3500", 0);
        let result = calculate(StipendClass::SelfFunded, &dec("10000"), &[r]).unwrap();
        assert_eq!(result.applied[0].amount, dec("2500"));
    }

    #[test]
    fn test_max_clamp_lowers_candidate() {
        let mut r = rule("Mess", "2000", "0", "1500", 0);
        r.base_amount = dec("2000");
        let result = calculate(StipendClass::SelfFunded, &dec("10000"), &[r]).unwrap();
        assert_eq!(result.applied[0].amount, dec("1500"));
    }

    #[test]
    fn test_zero_max_rule_contributes_zero_without_reducing() {
        let zero = rule("Zero", "0", "0", "0", 100);
        let mess = rule("Mess", "500", "0", "500", 1);
        let result = calculate(StipendClass::SelfFunded, &dec("1000"), &[zero, mess]).unwrap();

        assert_eq!(result.applied.len(), 2);
        assert_eq!(result.applied[0].rule_name, "Zero");
        assert_eq!(result.applied[0].amount, dec("0"));
        assert!(!result.applied[0].skipped);
        assert_eq!(result.applied[1].amount, dec("500"));
        assert_eq!(result.net_amount, dec("500"));
    }

    #[test]
    fn test_exhaustion_marks_mandatory_rules_skipped() {
        let a = rule("A", "5000", "0", "5000", 100);
        let b = rule("B", "1000", "0", "1000", 50);
        let mut c = rule("C", "1000", "0", "1000", 10);
        c.is_optional = true;
        let result = calculate(StipendClass::SelfFunded, &dec("5000"), &[a, b, c]).unwrap();

        assert_eq!(result.net_amount, dec("0"));
        // B leaves a zero-amount marker; optional C is omitted entirely.
        assert_eq!(result.applied.len(), 2);
        assert_eq!(result.applied[1].rule_name, "B");
        assert_eq!(result.applied[1].amount, dec("0"));
        assert!(result.applied[1].skipped);
    }

    #[test]
    fn test_net_never_negative() {
        let a = rule("A", "4000", "0", "4000", 100);
        let b = rule("B", "3000", "0", "3000", 1);
        let result = calculate(StipendClass::SelfFunded, &dec("5000"), &[a, b]).unwrap();
        assert_eq!(result.net_amount, dec("0"));
        assert!(result.net_amount >= BigDecimal::zero());
    }

    #[test]
    fn test_rejects_non_positive_base() {
        assert!(matches!(
            calculate(StipendClass::SelfFunded, &dec("0"), &[]),
            Err(CalcError::NonPositiveBase(_))
        ));
        assert!(matches!(
            calculate(StipendClass::SelfFunded, &dec("-1"), &[]),
            Err(CalcError::NonPositiveBase(_))
        ));
    }

    #[test]
    fn test_rejects_inactive_rule() {
        let mut r = rule("Hostel", "3000", "0", "3000", 0);
        r.is_active = false;
        assert!(matches!(
            calculate(StipendClass::SelfFunded, &dec("5000"), &[r]),
            Err(CalcError::UnusableRule(name)) if name == "Hostel"
        ));
    }

    #[test]
    fn test_rejects_inapplicable_rule() {
        let mut r = rule("Hostel", "3000", "0", "3000", 0);
        r.applies_to_self_funded = false;
        assert!(matches!(
            calculate(StipendClass::SelfFunded, &dec("5000"), &[r]),
            Err(CalcError::UnusableRule(_))
        ));
    }

    #[test]
    fn test_calculation_is_deterministic() {
        let rules = vec![
            rule("A", "400.50", "100", "500", 3),
            rule("B", "250.25", "0", "300", 3),
            rule("C", "99.99", "50", "120", -1),
        ];
        let first = calculate(StipendClass::Partial, &dec("1234.56"), &rules).unwrap();
        let second = calculate(StipendClass::Partial, &dec("1234.56"), &rules).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_monthly_divides_annual_by_twelve() {
        let result = calculate_monthly(StipendClass::SelfFunded, &dec("60000"), &[]).unwrap();
        assert_eq!(result.base_amount, dec("5000"));
        assert_eq!(result.net_amount, dec("5000"));
    }

    #[test]
    fn test_monthly_drops_sub_cent_digits() {
        // 100 / 12 = 8.3333... -> 8.33
        let result = calculate_monthly(StipendClass::SelfFunded, &dec("100"), &[]).unwrap();
        assert_eq!(result.base_amount, dec("8.33"));

        // 50 / 12 = 4.1666... -> 4.16
        let result = calculate_monthly(StipendClass::SelfFunded, &dec("50"), &[]).unwrap();
        assert_eq!(result.base_amount, dec("4.16"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_rules() -> impl Strategy<Value = Vec<DeductionRule>> {
            proptest::collection::vec(
                (1u32..=5_000, 0u32..=1_000, 0u32..=2_000, -100i32..=100, any::<bool>()),
                0..8,
            )
            .prop_map(|specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (base, min, extra, priority, optional))| {
                        let min = BigDecimal::from(min);
                        let base = (&min + BigDecimal::from(base)).with_scale(2);
                        let max = (&base + BigDecimal::from(extra)).with_scale(2);
                        let mut r = rule(&format!("Rule{i}"), "0", "0", "0", priority);
                        r.min_amount = min.with_scale(2);
                        r.base_amount = base;
                        r.max_amount = max;
                        r.is_optional = optional;
                        r
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn net_plus_total_equals_base(base in 1u32..=1_000_000, rules in arb_rules()) {
                let base = BigDecimal::from(base).with_scale(2);
                let result = calculate(StipendClass::SelfFunded, &base, &rules).unwrap();
                prop_assert_eq!(&result.net_amount + &result.total_deductions, base);
            }

            #[test]
            fn net_is_never_negative(base in 1u32..=10_000, rules in arb_rules()) {
                let base = BigDecimal::from(base).with_scale(2);
                let result = calculate(StipendClass::SelfFunded, &base, &rules).unwrap();
                prop_assert!(result.net_amount >= BigDecimal::zero());
            }

            #[test]
            fn applied_amounts_sum_to_total(base in 1u32..=100_000, rules in arb_rules()) {
                let base = BigDecimal::from(base).with_scale(2);
                let result = calculate(StipendClass::SelfFunded, &base, &rules).unwrap();
                let sum: BigDecimal = result
                    .applied
                    .iter()
                    .map(|a| a.amount.clone())
                    .sum::<BigDecimal>()
                    .with_scale(2);
                prop_assert_eq!(sum, result.total_deductions);
            }

            #[test]
            fn amounts_respect_rule_windows(base in 1u32..=100_000, rules in arb_rules()) {
                let base = BigDecimal::from(base).with_scale(2);
                let result = calculate(StipendClass::SelfFunded, &base, &rules).unwrap();
                for entry in &result.applied {
                    let rule = rules.iter().find(|r| r.id == entry.rule_id).unwrap();
                    // Capped entries may fall below min; never above max.
                    prop_assert!(entry.amount <= rule.max_amount);
                }
            }
        }
    }
}
