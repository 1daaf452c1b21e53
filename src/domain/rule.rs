//! Deduction rule domain entity: an authored policy applied during
//! stipend calculation. Rules are retired, never hard-deleted.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{ParseEnumError, StipendClass};

/// How often a rule is expected to apply. Exactly one cadence per rule;
/// single-call calculation treats both the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Monthly,
    Annual,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Monthly => "monthly",
            Cadence::Annual => "annual",
        }
    }
}

impl FromStr for Cadence {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Cadence::Monthly),
            "annual" => Ok(Cadence::Annual),
            other => Err(ParseEnumError::new("cadence", other)),
        }
    }
}

impl TryFrom<String> for Cadence {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeductionRule {
    pub id: Uuid,
    pub name: String,
    pub type_tag: String,
    pub description: String,
    pub base_amount: BigDecimal,
    pub min_amount: BigDecimal,
    pub max_amount: BigDecimal,
    pub applies_to_full_scholar: bool,
    pub applies_to_self_funded: bool,
    #[sqlx(try_from = "String")]
    pub cadence: Cadence,
    pub is_optional: bool,
    pub priority: i32,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl DeductionRule {
    pub fn new(input: NewRule, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            type_tag: input.type_tag,
            description: input.description,
            base_amount: input.base_amount.with_scale(2),
            min_amount: input.min_amount.with_scale(2),
            max_amount: input.max_amount.with_scale(2),
            applies_to_full_scholar: input.applies_to_full_scholar,
            applies_to_self_funded: input.applies_to_self_funded,
            cadence: input.cadence,
            is_optional: input.is_optional,
            priority: input.priority,
            is_active: true,
            created_by,
            modified_by: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Whether this rule participates in calculations for the given class.
    /// Partial scholars fund part of their own costs, so self-funded rules
    /// apply to them.
    pub fn applies_to(&self, class: StipendClass) -> bool {
        match class {
            StipendClass::FullScholarship => self.applies_to_full_scholar,
            StipendClass::SelfFunded | StipendClass::Partial => self.applies_to_self_funded,
        }
    }
}

/// Request payload for authoring a new rule.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub type_tag: String,
    #[serde(default)]
    pub description: String,
    pub base_amount: BigDecimal,
    pub min_amount: BigDecimal,
    pub max_amount: BigDecimal,
    pub applies_to_full_scholar: bool,
    pub applies_to_self_funded: bool,
    pub cadence: Cadence,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub priority: i32,
}

/// Partial update for an existing rule; absent fields keep their value.
/// The merged rule is re-validated in full before any write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulePatch {
    pub name: Option<String>,
    pub type_tag: Option<String>,
    pub description: Option<String>,
    pub base_amount: Option<BigDecimal>,
    pub min_amount: Option<BigDecimal>,
    pub max_amount: Option<BigDecimal>,
    pub applies_to_full_scholar: Option<bool>,
    pub applies_to_self_funded: Option<bool>,
    pub cadence: Option<Cadence>,
    pub is_optional: Option<bool>,
    pub priority: Option<i32>,
}

impl RulePatch {
    /// Applies the patch on top of an existing rule, stamping the modifier.
    pub fn apply_to(&self, rule: &DeductionRule, modified_by: Option<Uuid>) -> DeductionRule {
        let mut updated = rule.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(type_tag) = &self.type_tag {
            updated.type_tag = type_tag.clone();
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(base) = &self.base_amount {
            updated.base_amount = base.with_scale(2);
        }
        if let Some(min) = &self.min_amount {
            updated.min_amount = min.with_scale(2);
        }
        if let Some(max) = &self.max_amount {
            updated.max_amount = max.with_scale(2);
        }
        if let Some(flag) = self.applies_to_full_scholar {
            updated.applies_to_full_scholar = flag;
        }
        if let Some(flag) = self.applies_to_self_funded {
            updated.applies_to_self_funded = flag;
        }
        if let Some(cadence) = self.cadence {
            updated.cadence = cadence;
        }
        if let Some(optional) = self.is_optional {
            updated.is_optional = optional;
        }
        if let Some(priority) = self.priority {
            updated.priority = priority;
        }
        updated.modified_by = modified_by;
        updated.modified_at = Utc::now();
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    fn sample_rule() -> DeductionRule {
        DeductionRule::new(
            NewRule {
                name: "Hostel".to_string(),
                type_tag: "hostel".to_string(),
                description: "Hostel accommodation".to_string(),
                base_amount: BigDecimal::from(3000),
                min_amount: BigDecimal::from(2500),
                max_amount: BigDecimal::from(3500),
                applies_to_full_scholar: true,
                applies_to_self_funded: false,
                cadence: Cadence::Monthly,
                is_optional: false,
                priority: 100,
            },
            None,
        )
    }

    #[test]
    fn test_cadence_roundtrip() {
        assert_eq!(Cadence::from_str("monthly").unwrap(), Cadence::Monthly);
        assert_eq!(Cadence::from_str("annual").unwrap(), Cadence::Annual);
        assert!(Cadence::from_str("weekly").is_err());
    }

    #[test]
    fn test_applicability_by_class() {
        let rule = sample_rule();
        assert!(rule.applies_to(StipendClass::FullScholarship));
        assert!(!rule.applies_to(StipendClass::SelfFunded));
        assert!(!rule.applies_to(StipendClass::Partial));
    }

    #[test]
    fn test_partial_class_uses_self_funded_flag() {
        let mut rule = sample_rule();
        rule.applies_to_full_scholar = false;
        rule.applies_to_self_funded = true;
        assert!(rule.applies_to(StipendClass::Partial));
        assert!(rule.applies_to(StipendClass::SelfFunded));
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let rule = sample_rule();
        let patch = RulePatch {
            priority: Some(50),
            ..Default::default()
        };
        let updated = patch.apply_to(&rule, Some(Uuid::new_v4()));

        assert_eq!(updated.priority, 50);
        assert_eq!(updated.name, rule.name);
        assert_eq!(updated.base_amount, rule.base_amount);
        assert!(updated.modified_at >= rule.modified_at);
        assert!(updated.modified_by.is_some());
    }

    #[test]
    fn test_new_rule_is_active() {
        let rule = sample_rule();
        assert!(rule.is_active);
        assert!(rule.modified_by.is_none());
    }
}
