//! Drift detection: determinism verification and state comparison.
//!
//! Currency and months are compared as integers (months as fixed-point raw
//! values, SCALE = 10_000). Category scores are compared as integer deltas;
//! no float arithmetic in the report.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{error, info};

use pm_sim_kernel::domain::{ProjectState, RiskStatus};
use pm_sim_kernel::engine::EngineError;
use pm_sim_kernel::events::DecisionEvent;
use pm_sim_kernel::invariants::ValidationMode;
use pm_sim_kernel::metrics::metrics;
use pm_sim_kernel::scenario::Scenario;

use crate::replay;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriftError {
    #[error("replay failed: {0}")]
    Engine(#[from] EngineError),
    #[error("DETERMINISM FAILURE: two replays produced different hashes (run 1: {first}, run 2: {second})")]
    Nondeterministic { first: String, second: String },
}

/// Verify determinism by replaying the same decisions twice and comparing
/// hashes. Returns the agreed hash.
pub fn verify_determinism(
    scenario: &Scenario,
    events: &[DecisionEvent],
    mode: ValidationMode,
) -> Result<String, DriftError> {
    let hash1 = replay::rebuild_hash(scenario, events, mode)?;
    let hash2 = replay::rebuild_hash(scenario, events, mode)?;

    if hash1 != hash2 {
        error!(first = %hash1, second = %hash2, "replay is not deterministic");
        return Err(DriftError::Nondeterministic {
            first: hash1,
            second: hash2,
        });
    }
    info!(events = events.len(), hash = %hash1, "determinism verified");
    Ok(hash1)
}

/// Satisfaction change for a stakeholder present in both states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatisfactionChange {
    pub id: String,
    pub before: i32,
    pub after: i32,
}

/// Status change for a risk present in both states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskStatusChange {
    pub id: String,
    pub before: RiskStatus,
    pub after: RiskStatus,
}

/// Structured drift report. Every `_delta` is `b - a`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    pub actual_cost_delta: i64,
    pub earned_value_delta: i64,
    pub planned_value_delta: i64,
    /// Fixed-point raw months.
    pub elapsed_months_delta: i64,
    pub defects_found_delta: i64,
    pub defects_resolved_delta: i64,
    pub budget_score_delta: i64,
    pub schedule_score_delta: i64,
    pub quality_score_delta: i64,
    pub stakeholder_score_delta: i64,
    pub risk_score_delta: i64,
    pub satisfaction_changes: Vec<SatisfactionChange>,
    pub added_risks: Vec<String>,
    pub removed_risks: Vec<String>,
    pub risk_status_changes: Vec<RiskStatusChange>,
}

impl DriftReport {
    pub fn is_empty(&self) -> bool {
        *self == DriftReport::default()
    }
}

/// Structured comparison of two project states.
pub fn compare_states(state_a: &ProjectState, state_b: &ProjectState) -> DriftReport {
    let metrics_a = metrics(state_a);
    let metrics_b = metrics(state_b);
    let score_delta = |a: u32, b: u32| i64::from(b) - i64::from(a);

    let satisfaction_a: BTreeMap<&str, i32> = state_a
        .stakeholders
        .iter()
        .map(|s| (s.id.as_str(), s.satisfaction))
        .collect();
    let satisfaction_changes = state_b
        .stakeholders
        .iter()
        .filter_map(|s| {
            let before = *satisfaction_a.get(s.id.as_str())?;
            (before != s.satisfaction).then(|| SatisfactionChange {
                id: s.id.clone(),
                before,
                after: s.satisfaction,
            })
        })
        .collect();

    let risks_a: BTreeMap<&str, RiskStatus> =
        state_a.risks.iter().map(|r| (r.id.as_str(), r.status)).collect();
    let risks_b: BTreeMap<&str, RiskStatus> =
        state_b.risks.iter().map(|r| (r.id.as_str(), r.status)).collect();
    let ids_a: BTreeSet<&str> = risks_a.keys().copied().collect();
    let ids_b: BTreeSet<&str> = risks_b.keys().copied().collect();

    let added_risks = ids_b.difference(&ids_a).map(|s| s.to_string()).collect();
    let removed_risks = ids_a.difference(&ids_b).map(|s| s.to_string()).collect();
    let risk_status_changes = ids_a
        .intersection(&ids_b)
        .filter(|id| risks_a[*id] != risks_b[*id])
        .map(|id| RiskStatusChange {
            id: id.to_string(),
            before: risks_a[*id],
            after: risks_b[*id],
        })
        .collect();

    DriftReport {
        actual_cost_delta: state_b.actual_cost - state_a.actual_cost,
        earned_value_delta: state_b.earned_value - state_a.earned_value,
        planned_value_delta: state_b.planned_value - state_a.planned_value,
        elapsed_months_delta: state_b.elapsed_months.raw() - state_a.elapsed_months.raw(),
        defects_found_delta: state_b.quality.defects_found - state_a.quality.defects_found,
        defects_resolved_delta: state_b.quality.defects_resolved - state_a.quality.defects_resolved,
        budget_score_delta: score_delta(metrics_a.budget_score, metrics_b.budget_score),
        schedule_score_delta: score_delta(metrics_a.schedule_score, metrics_b.schedule_score),
        quality_score_delta: score_delta(metrics_a.quality_score, metrics_b.quality_score),
        stakeholder_score_delta: score_delta(metrics_a.stakeholder_score, metrics_b.stakeholder_score),
        risk_score_delta: score_delta(metrics_a.risk_score, metrics_b.risk_score),
        satisfaction_changes,
        added_risks,
        removed_risks,
        risk_status_changes,
    }
}

/// Replay two decision logs side by side and return the sequence number of
/// the first decision after which their states differ. `None` when every
/// common prefix matches and the logs have equal length.
pub fn first_divergence(
    scenario: &Scenario,
    log_a: &[DecisionEvent],
    log_b: &[DecisionEvent],
    mode: ValidationMode,
) -> Result<Option<u64>, DriftError> {
    let common = log_a.len().min(log_b.len());
    for n in 1..=common {
        let hash_a = replay::rebuild_hash(scenario, &log_a[..n], mode)?;
        let hash_b = replay::rebuild_hash(scenario, &log_b[..n], mode)?;
        if hash_a != hash_b {
            return Ok(Some(log_a[n - 1].sequence));
        }
    }
    if log_a.len() != log_b.len() {
        return Ok(Some(common as u64 + 1));
    }
    Ok(None)
}
