/// PM Simulator Kernel v1: Derived Metrics
///
/// Read-only projections of a `ProjectState`.
///
/// Ratios are `f64`; every score is an integer in `[0, 100]` rounded
/// half-up.

use serde::Serialize;

use crate::arithmetic::{clamp_score, round_half_up};
use crate::domain::{ProjectRisk, ProjectState, QualityRecord, RiskStatus, StakeholderState, TestCoverage};

/// Base quality score before defect, review and coverage adjustments.
pub const QUALITY_BASE_SCORE: i64 = 80;

/// Stakeholder score when there are no stakeholders (neutral 3 × 20).
pub const EMPTY_STAKEHOLDER_SCORE: u32 = 60;

// ── EVM ratios ─────────────────────────────────────────────────────

/// Cost performance index `EV / AC`; exactly 1 when AC is zero.
pub fn cpi(state: &ProjectState) -> f64 {
    if state.actual_cost == 0 {
        return 1.0;
    }
    state.earned_value as f64 / state.actual_cost as f64
}

/// Schedule performance index `EV / PV`; exactly 1 when PV is zero.
pub fn spi(state: &ProjectState) -> f64 {
    if state.planned_value == 0 {
        return 1.0;
    }
    state.earned_value as f64 / state.planned_value as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CpiStatus {
    Good,
    Caution,
    OverBudget,
}

impl CpiStatus {
    pub fn from_cpi(cpi: f64) -> Self {
        if cpi >= 1.0 {
            CpiStatus::Good
        } else if cpi >= 0.9 {
            CpiStatus::Caution
        } else {
            CpiStatus::OverBudget
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CpiStatus::Good => "good",
            CpiStatus::Caution => "caution",
            CpiStatus::OverBudget => "over budget",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpiStatus {
    OnTrack,
    SlightlyDelayed,
    Delayed,
}

impl SpiStatus {
    pub fn from_spi(spi: f64) -> Self {
        if spi >= 1.0 {
            SpiStatus::OnTrack
        } else if spi >= 0.9 {
            SpiStatus::SlightlyDelayed
        } else {
            SpiStatus::Delayed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpiStatus::OnTrack => "on track",
            SpiStatus::SlightlyDelayed => "slightly delayed",
            SpiStatus::Delayed => "delayed",
        }
    }
}

// ── Category scores ────────────────────────────────────────────────

pub fn budget_score(state: &ProjectState) -> u32 {
    clamp_score(round_half_up(cpi(state) * 100.0))
}

/// `spi × 100 − 5 per month of delay`.
pub fn schedule_score(state: &ProjectState) -> u32 {
    let raw = spi(state) * 100.0 - state.delay_months().as_f64() * 5.0;
    clamp_score(round_half_up(raw))
}

pub fn quality_score(quality: &QualityRecord) -> u32 {
    let coverage_adjustment = match quality.test_coverage {
        TestCoverage::Full => 10,
        TestCoverage::Partial => 5,
        TestCoverage::Minimal => -5,
        TestCoverage::None => -10,
    };
    let score = QUALITY_BASE_SCORE
        .saturating_sub(quality.unresolved_defects().saturating_mul(3))
        .saturating_sub(quality.reviews_skipped.saturating_mul(10))
        .saturating_add(coverage_adjustment);
    clamp_score(score)
}

/// Mean satisfaction, or `None` for an empty roster.
pub fn mean_satisfaction(stakeholders: &[StakeholderState]) -> Option<f64> {
    if stakeholders.is_empty() {
        return None;
    }
    let sum: i64 = stakeholders.iter().map(|s| s.satisfaction as i64).sum();
    Some(sum as f64 / stakeholders.len() as f64)
}

/// Maps the 1–5 satisfaction scale onto 20–100.
pub fn stakeholder_score(stakeholders: &[StakeholderState]) -> u32 {
    match mean_satisfaction(stakeholders) {
        Some(mean) => clamp_score(round_half_up(mean * 20.0)),
        None => EMPTY_STAKEHOLDER_SCORE,
    }
}

pub fn risk_score(risks: &[ProjectRisk]) -> u32 {
    let summary = risk_summary(risks);
    let penalty = (summary.unmitigated as i64)
        .saturating_mul(15)
        .saturating_add((summary.occurred as i64).saturating_mul(25));
    clamp_score(100i64.saturating_sub(penalty))
}

/// `completed / total × 100`; completed is clamped to `0..=total`.
pub fn document_score(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    clamp_score(round_half_up(completed as f64 / total as f64 * 100.0))
}

// ── Summaries ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    pub total: usize,
    /// Risks still in `identified` status.
    pub unmitigated: usize,
    pub occurred: usize,
}

pub fn risk_summary(risks: &[ProjectRisk]) -> RiskSummary {
    RiskSummary {
        total: risks.len(),
        unmitigated: risks.iter().filter(|r| r.status == RiskStatus::Identified).count(),
        occurred: risks.iter().filter(|r| r.status == RiskStatus::Occurred).count(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeholderSummary {
    /// Mean satisfaction rounded to one decimal.
    pub average: f64,
    pub min_name: String,
    pub min_satisfaction: i32,
}

/// Average plus the least satisfied stakeholder. On ties the one listed
/// last is reported.
pub fn stakeholder_summary(stakeholders: &[StakeholderState]) -> StakeholderSummary {
    let Some(mean) = mean_satisfaction(stakeholders) else {
        return StakeholderSummary {
            average: 3.0,
            min_name: "-".to_string(),
            min_satisfaction: 3,
        };
    };
    let mut min = &stakeholders[0];
    for s in &stakeholders[1..] {
        if s.satisfaction <= min.satisfaction {
            min = s;
        }
    }
    StakeholderSummary {
        average: round_half_up(mean * 10.0) as f64 / 10.0,
        min_name: min.name.clone(),
        min_satisfaction: min.satisfaction,
    }
}

// ── Aggregate ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetrics {
    pub cpi: f64,
    pub spi: f64,
    pub budget_score: u32,
    pub schedule_score: u32,
    pub quality_score: u32,
    pub stakeholder_score: u32,
    pub risk_score: u32,
}

pub fn metrics(state: &ProjectState) -> ProjectMetrics {
    ProjectMetrics {
        cpi: cpi(state),
        spi: spi(state),
        budget_score: budget_score(state),
        schedule_score: schedule_score(state),
        quality_score: quality_score(&state.quality),
        stakeholder_score: stakeholder_score(&state.stakeholders),
        risk_score: risk_score(&state.risks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::Months;
    use crate::domain::{Engagement, RiskLevel};
    use crate::scenario::Scenario;
    use crate::state::create_initial_state;

    fn fresh() -> ProjectState {
        create_initial_state(&Scenario::default())
    }

    fn risk(id: &str, status: RiskStatus) -> ProjectRisk {
        ProjectRisk {
            id: id.to_string(),
            description: String::new(),
            probability: RiskLevel::Medium,
            impact: RiskLevel::Medium,
            status,
            response: None,
            source: "testing".to_string(),
        }
    }

    #[test]
    fn test_ratios_are_one_on_zero_denominator() {
        let state = fresh();
        assert_eq!(cpi(&state), 1.0);
        assert_eq!(spi(&state), 1.0);
        let m = metrics(&state);
        assert_eq!(m.budget_score, 100);
        assert_eq!(m.schedule_score, 100);
    }

    #[test]
    fn test_cpi_and_status_bands() {
        let mut state = fresh();
        state.earned_value = 900;
        state.actual_cost = 1000;
        state.planned_value = 1000;
        assert!((cpi(&state) - 0.9).abs() < 1e-12);
        assert_eq!(CpiStatus::from_cpi(cpi(&state)), CpiStatus::Caution);
        assert_eq!(SpiStatus::from_spi(spi(&state)), SpiStatus::SlightlyDelayed);
        assert_eq!(CpiStatus::from_cpi(0.89), CpiStatus::OverBudget);
        assert_eq!(SpiStatus::from_spi(1.2), SpiStatus::OnTrack);
        assert_eq!(budget_score(&state), 90);
    }

    #[test]
    fn test_budget_score_capped_at_100() {
        let mut state = fresh();
        state.earned_value = 3000;
        state.actual_cost = 2000;
        assert_eq!(budget_score(&state), 100);
    }

    #[test]
    fn test_schedule_score_penalizes_delay() {
        let mut state = fresh();
        state.earned_value = 2000;
        state.planned_value = 2000;
        state.elapsed_months = Months::tenths(135);
        // 100 - 1.5 * 5 = 92.5 -> 93
        assert_eq!(schedule_score(&state), 93);
    }

    #[test]
    fn test_quality_score_boundaries() {
        let mut quality = QualityRecord::default();
        quality.test_coverage = TestCoverage::Full;
        assert_eq!(quality_score(&quality), 90);

        let quality = QualityRecord {
            defects_found: 5,
            defects_resolved: 3,
            reviews_skipped: 0,
            test_coverage: TestCoverage::None,
        };
        assert_eq!(quality_score(&quality), 64);
    }

    #[test]
    fn test_quality_score_clamped() {
        let quality = QualityRecord {
            defects_found: 30,
            defects_resolved: 0,
            reviews_skipped: 3,
            test_coverage: TestCoverage::Minimal,
        };
        assert_eq!(quality_score(&quality), 0);

        // Over-resolution raises the score but never past 100.
        let quality = QualityRecord {
            defects_found: 0,
            defects_resolved: 10,
            reviews_skipped: 0,
            test_coverage: TestCoverage::Full,
        };
        assert_eq!(quality_score(&quality), 100);
    }

    #[test]
    fn test_stakeholder_score() {
        let mut state = fresh();
        assert_eq!(stakeholder_score(&state.stakeholders), 60);
        for s in &mut state.stakeholders {
            s.satisfaction = 5;
        }
        assert_eq!(stakeholder_score(&state.stakeholders), 100);
        assert_eq!(stakeholder_score(&[]), EMPTY_STAKEHOLDER_SCORE);
    }

    #[test]
    fn test_risk_score_and_summary() {
        let risks = vec![
            risk("R1", RiskStatus::Identified),
            risk("R2", RiskStatus::Occurred),
            risk("R3", RiskStatus::Mitigated),
            risk("R4", RiskStatus::Closed),
        ];
        assert_eq!(
            risk_summary(&risks),
            RiskSummary {
                total: 4,
                unmitigated: 1,
                occurred: 1
            }
        );
        assert_eq!(risk_score(&risks), 60);

        let many: Vec<ProjectRisk> = (0..8).map(|i| risk(&format!("R{i}"), RiskStatus::Identified)).collect();
        assert_eq!(risk_score(&many), 0);
    }

    #[test]
    fn test_document_score() {
        assert_eq!(document_score(7, 7), 100);
        assert_eq!(document_score(4, 7), 57);
        assert_eq!(document_score(0, 7), 0);
        assert_eq!(document_score(12, 7), 100);
    }

    #[test]
    fn test_stakeholder_summary() {
        let mut state = fresh();
        state.stakeholders[1].satisfaction = 2;
        state.stakeholders[4].satisfaction = 2;
        state.stakeholders[0].satisfaction = 5;
        let summary = stakeholder_summary(&state.stakeholders);
        // (5 + 2 + 3 + 3 + 2 + 3 + 3) / 7 = 3.0
        assert_eq!(summary.average, 3.0);
        assert_eq!(summary.min_satisfaction, 2);
        assert_eq!(summary.min_name, "Mari Yamamoto");

        let empty = stakeholder_summary(&[]);
        assert_eq!(empty.min_name, "-");
        assert_eq!(empty.average, 3.0);
    }

    #[test]
    fn test_summary_average_rounding() {
        let make = |sat| StakeholderState {
            id: format!("s{sat}"),
            name: format!("S{sat}"),
            satisfaction: sat,
            engagement: Engagement::Neutral,
        };
        let roster = vec![make(4), make(4), make(5)];
        assert_eq!(stakeholder_summary(&roster).average, 4.3);
    }
}
