/// PM Simulator Kernel v1: State Construction
///
/// EVM quantities start at zero, every stakeholder at neutral satisfaction,
/// the risk register empty and test coverage at `none`.

use crate::arithmetic::Months;
use crate::domain::{ProjectState, QualityRecord, StakeholderState};
use crate::scenario::Scenario;

/// Satisfaction every stakeholder starts at.
pub const NEUTRAL_SATISFACTION: i32 = 3;

/// Create a fresh ProjectState for the given scenario.
pub fn create_initial_state(scenario: &Scenario) -> ProjectState {
    ProjectState {
        planned_budget: scenario.planned_budget,
        actual_cost: 0,
        earned_value: 0,
        planned_value: 0,
        total_months: scenario.total_months,
        elapsed_months: Months::ZERO,
        quality: QualityRecord::default(),
        stakeholders: scenario
            .stakeholders
            .iter()
            .map(|p| StakeholderState {
                id: p.id.clone(),
                name: p.name.clone(),
                satisfaction: NEUTRAL_SATISFACTION,
                engagement: p.engagement,
            })
            .collect(),
        risks: Vec::new(),
        constants: scenario.constants.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TestCoverage;

    #[test]
    fn test_initial_state_defaults() {
        let state = create_initial_state(&Scenario::default());
        assert_eq!(state.planned_budget, 5000);
        assert_eq!(state.actual_cost, 0);
        assert_eq!(state.earned_value, 0);
        assert_eq!(state.planned_value, 0);
        assert_eq!(state.total_months, Months::whole(12));
        assert_eq!(state.delay_months(), Months::ZERO);
        assert_eq!(state.quality.test_coverage, TestCoverage::None);
        assert!(state.risks.is_empty());
        assert_eq!(state.stakeholders.len(), 7);
        assert!(state.stakeholders.iter().all(|s| s.satisfaction == 3));
    }
}
