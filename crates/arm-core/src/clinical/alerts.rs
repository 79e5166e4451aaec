//! Contextual alert evaluation.
//!
//! A medication declares static [`AlertRule`]s. Which of them are shown for
//! the current patient is decided here, on every query, with no caching:
//!
//! | kind          | applicable when                         |
//! |---------------|-----------------------------------------|
//! | `renal`       | effective clearance <= 30 mL/min        |
//! | `age`         | age >= 80 **and** weight <= 60 kg       |
//! | `interaction` | per [`UnevaluatedAlertPolicy`]          |
//! | `bleeding`    | per [`UnevaluatedAlertPolicy`]          |
//! | `hepatic`     | per [`UnevaluatedAlertPolicy`]          |

use serde::{Deserialize, Serialize};

use super::{has_severe_renal_impairment, is_frail_elderly};
use crate::models::{AlertKind, AlertRule, Patient};

/// What to do with alert kinds that have no patient-specific rule yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnevaluatedAlertPolicy {
    /// Hide them until dedicated logic exists.
    #[default]
    Exclude,
    /// Always surface them.
    Include,
}

/// Filters a medication's alert rules down to those relevant for a patient.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator {
    policy: UnevaluatedAlertPolicy,
}

impl AlertEvaluator {
    pub fn new(policy: UnevaluatedAlertPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnevaluatedAlertPolicy {
        self.policy
    }

    /// Whether a single rule applies to the patient.
    pub fn applies(&self, patient: &Patient, rule: &AlertRule) -> bool {
        match rule.kind {
            AlertKind::Renal => has_severe_renal_impairment(patient),
            AlertKind::Age => is_frail_elderly(patient),
            AlertKind::Interaction | AlertKind::Bleeding | AlertKind::Hepatic => {
                self.policy == UnevaluatedAlertPolicy::Include
            }
        }
    }

    /// Applicable rules, in declaration order.
    pub fn evaluate<'a>(&self, patient: &Patient, alerts: &'a [AlertRule]) -> Vec<&'a AlertRule> {
        alerts
            .iter()
            .filter(|rule| self.applies(patient, rule))
            .collect()
    }

    /// Badge indicator: at least one rule applies.
    pub fn has_applicable(&self, patient: &Patient, alerts: &[AlertRule]) -> bool {
        !self.evaluate(patient, alerts).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Severity};

    fn patient(age: u32, weight: f64, clearance: f64) -> Patient {
        Patient {
            sns: None,
            name: "Test".into(),
            age,
            weight,
            gender: Gender::Male,
            conditions: vec![],
            creatinine: 1.0,
            creatinine_clearance: Some(clearance),
            current_medications: vec![],
        }
    }

    fn rule(kind: AlertKind) -> AlertRule {
        AlertRule {
            kind,
            condition: format!("{:?} condition", kind),
            message: format!("{:?} message", kind),
            severity: Some(Severity::Medium),
        }
    }

    fn all_rules() -> Vec<AlertRule> {
        vec![
            rule(AlertKind::Renal),
            rule(AlertKind::Age),
            rule(AlertKind::Interaction),
            rule(AlertKind::Bleeding),
            rule(AlertKind::Hepatic),
        ]
    }

    #[test]
    fn test_renal_threshold_inclusive() {
        let evaluator = AlertEvaluator::default();
        let rules = vec![rule(AlertKind::Renal)];

        assert_eq!(evaluator.evaluate(&patient(60, 70.0, 30.0), &rules).len(), 1);
        assert_eq!(evaluator.evaluate(&patient(60, 70.0, 15.0), &rules).len(), 1);
        assert!(evaluator.evaluate(&patient(60, 70.0, 30.1), &rules).is_empty());
    }

    #[test]
    fn test_age_requires_both_conditions() {
        let evaluator = AlertEvaluator::default();
        let rules = vec![rule(AlertKind::Age)];

        assert!(evaluator.evaluate(&patient(85, 70.0, 80.0), &rules).is_empty());
        assert!(evaluator.evaluate(&patient(75, 55.0, 80.0), &rules).is_empty());
        assert_eq!(evaluator.evaluate(&patient(85, 55.0, 80.0), &rules).len(), 1);
        assert_eq!(evaluator.evaluate(&patient(80, 60.0, 80.0), &rules).len(), 1);
    }

    #[test]
    fn test_exclude_policy_hides_unevaluated_kinds() {
        let evaluator = AlertEvaluator::new(UnevaluatedAlertPolicy::Exclude);
        let rules = all_rules();
        let frail = patient(85, 50.0, 20.0);

        let kinds: Vec<_> = evaluator.evaluate(&frail, &rules).iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Renal, AlertKind::Age]);
    }

    #[test]
    fn test_include_policy_surfaces_unevaluated_kinds() {
        let evaluator = AlertEvaluator::new(UnevaluatedAlertPolicy::Include);
        let rules = all_rules();
        let healthy = patient(40, 80.0, 110.0);

        let kinds: Vec<_> = evaluator.evaluate(&healthy, &rules).iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![AlertKind::Interaction, AlertKind::Bleeding, AlertKind::Hepatic]
        );
        assert!(evaluator.has_applicable(&healthy, &rules));
    }

    #[test]
    fn test_has_applicable_follows_evaluation() {
        let evaluator = AlertEvaluator::default();
        let rules = vec![rule(AlertKind::Bleeding), rule(AlertKind::Renal)];

        assert!(!evaluator.has_applicable(&patient(50, 70.0, 90.0), &rules));
        assert!(evaluator.has_applicable(&patient(50, 70.0, 25.0), &rules));
        assert!(!evaluator.has_applicable(&patient(50, 70.0, 25.0), &[]));
    }

    #[test]
    fn test_renal_uses_derived_clearance_when_missing() {
        let evaluator = AlertEvaluator::default();
        let rules = vec![rule(AlertKind::Renal)];
        let mut p = patient(85, 50.0, 0.0);
        p.creatinine_clearance = None;
        // (55 * 50) / (72 * 2.0) = 19.1
        p.creatinine = 2.0;
        assert_eq!(evaluator.evaluate(&p, &rules).len(), 1);

        // Underivable clearance never fires
        p.creatinine = 0.0;
        assert!(evaluator.evaluate(&p, &rules).is_empty());
    }
}
