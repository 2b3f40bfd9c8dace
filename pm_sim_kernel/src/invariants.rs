/// PM Simulator Kernel v1: Invariant Checks
///
/// Post-transition validation. Returns the first violation found.
/// The engine runs this after every applied decision; snapshot restore
/// runs it on decoded state.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::arithmetic::{Months, SATISFACTION_MAX, SATISFACTION_MIN};
use crate::domain::ProjectState;

/// How much the quality record is trusted.
///
/// `Permissive` accepts `defects_resolved > defects_found` and negative
/// counters, as content authoring allows. `Strict` rejects both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Permissive,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("[INVARIANT:satisfaction_range] stakeholder {id:?} has satisfaction {value}, outside [1, 5]")]
    SatisfactionOutOfRange { id: String, value: i32 },
    #[error("[INVARIANT:unique_stakeholders] stakeholder id {0:?} appears more than once")]
    DuplicateStakeholder(String),
    #[error("[INVARIANT:unique_risks] risk id {0:?} appears more than once")]
    DuplicateRisk(String),
    #[error("[INVARIANT:positive_plan] plannedBudget={budget} totalMonths={months} must both be positive")]
    NonPositivePlan { budget: i64, months: Months },
    #[error("[INVARIANT:evm_frozen] {field} is {value} before the baseline is set")]
    EvmBeforeBaseline { field: &'static str, value: String },
    #[error("[INVARIANT:non_negative_quality] {field} is negative ({value})")]
    NegativeQualityCounter { field: &'static str, value: i64 },
    #[error("[INVARIANT:resolved_within_found] defectsResolved={resolved} exceeds defectsFound={found}")]
    ResolvedExceedsFound { found: i64, resolved: i64 },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every check applicable to `mode`. Returns the first failure.
pub fn validate_invariants(
    state: &ProjectState,
    baseline_set: bool,
    mode: ValidationMode,
) -> Result<(), InvariantViolation> {
    check_positive_plan(state)?;
    check_satisfaction_range(state)?;
    check_unique_stakeholders(state)?;
    check_unique_risks(state)?;
    if !baseline_set {
        check_evm_frozen(state)?;
    }
    if mode == ValidationMode::Strict {
        check_quality_counters(state)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn check_positive_plan(state: &ProjectState) -> Result<(), InvariantViolation> {
    if state.planned_budget <= 0 || state.total_months <= Months::ZERO {
        return Err(InvariantViolation::NonPositivePlan {
            budget: state.planned_budget,
            months: state.total_months,
        });
    }
    Ok(())
}

fn check_satisfaction_range(state: &ProjectState) -> Result<(), InvariantViolation> {
    for s in &state.stakeholders {
        if !(SATISFACTION_MIN..=SATISFACTION_MAX).contains(&s.satisfaction) {
            return Err(InvariantViolation::SatisfactionOutOfRange {
                id: s.id.clone(),
                value: s.satisfaction,
            });
        }
    }
    Ok(())
}

fn check_unique_stakeholders(state: &ProjectState) -> Result<(), InvariantViolation> {
    let mut seen = BTreeSet::new();
    for s in &state.stakeholders {
        if !seen.insert(s.id.as_str()) {
            return Err(InvariantViolation::DuplicateStakeholder(s.id.clone()));
        }
    }
    Ok(())
}

fn check_unique_risks(state: &ProjectState) -> Result<(), InvariantViolation> {
    let mut seen = BTreeSet::new();
    for r in &state.risks {
        if !seen.insert(r.id.as_str()) {
            return Err(InvariantViolation::DuplicateRisk(r.id.clone()));
        }
    }
    Ok(())
}

fn check_evm_frozen(state: &ProjectState) -> Result<(), InvariantViolation> {
    let currency = [
        ("actualCost", state.actual_cost),
        ("earnedValue", state.earned_value),
        ("plannedValue", state.planned_value),
    ];
    for (field, value) in currency {
        if value != 0 {
            return Err(InvariantViolation::EvmBeforeBaseline {
                field,
                value: value.to_string(),
            });
        }
    }
    if !state.elapsed_months.is_zero() {
        return Err(InvariantViolation::EvmBeforeBaseline {
            field: "elapsedMonths",
            value: state.elapsed_months.to_string(),
        });
    }
    Ok(())
}

fn check_quality_counters(state: &ProjectState) -> Result<(), InvariantViolation> {
    let q = &state.quality;
    let counters = [
        ("defectsFound", q.defects_found),
        ("defectsResolved", q.defects_resolved),
        ("reviewsSkipped", q.reviews_skipped),
    ];
    for (field, value) in counters {
        if value < 0 {
            return Err(InvariantViolation::NegativeQualityCounter { field, value });
        }
    }
    if q.defects_resolved > q.defects_found {
        return Err(InvariantViolation::ResolvedExceedsFound {
            found: q.defects_found,
            resolved: q.defects_resolved,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use crate::state::create_initial_state;
    use crate::transitions::apply_baseline_confirmation;

    fn fresh() -> ProjectState {
        create_initial_state(&Scenario::default())
    }

    #[test]
    fn test_initial_state_is_valid() {
        validate_invariants(&fresh(), false, ValidationMode::Strict).unwrap();
    }

    #[test]
    fn test_satisfaction_out_of_range() {
        let mut state = fresh();
        state.stakeholders[2].satisfaction = 6;
        let err = validate_invariants(&state, false, ValidationMode::Permissive).unwrap_err();
        assert_eq!(
            err,
            InvariantViolation::SatisfactionOutOfRange {
                id: "sasaki".to_string(),
                value: 6
            }
        );
        assert!(err.to_string().contains("[INVARIANT:satisfaction_range]"));
    }

    #[test]
    fn test_evm_must_be_frozen_before_baseline() {
        let state = apply_baseline_confirmation(&fresh());
        assert!(matches!(
            validate_invariants(&state, false, ValidationMode::Permissive),
            Err(InvariantViolation::EvmBeforeBaseline { field: "actualCost", .. })
        ));
        validate_invariants(&state, true, ValidationMode::Permissive).unwrap();
    }

    #[test]
    fn test_duplicate_stakeholder_detected() {
        let mut state = fresh();
        let dup = state.stakeholders[0].clone();
        state.stakeholders.push(dup);
        assert!(matches!(
            validate_invariants(&state, false, ValidationMode::Permissive),
            Err(InvariantViolation::DuplicateStakeholder(id)) if id == "takayama"
        ));
    }

    #[test]
    fn test_resolved_exceeding_found_only_fails_strict() {
        let mut state = fresh();
        state.quality.defects_resolved = 2;
        validate_invariants(&state, false, ValidationMode::Permissive).unwrap();
        assert_eq!(
            validate_invariants(&state, false, ValidationMode::Strict),
            Err(InvariantViolation::ResolvedExceedsFound { found: 0, resolved: 2 })
        );
    }

    #[test]
    fn test_negative_counter_strict() {
        let mut state = fresh();
        state.quality.reviews_skipped = -1;
        assert!(matches!(
            validate_invariants(&state, false, ValidationMode::Strict),
            Err(InvariantViolation::NegativeQualityCounter { field: "reviewsSkipped", value: -1 })
        ));
    }
}
