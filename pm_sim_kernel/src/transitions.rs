/// PM Simulator Kernel v1: Centralized Transition Logic
///
/// ALL project-state mutation lives here.
/// Every function takes the current state by reference and returns a new
/// one; the input is never mutated. Nothing here can fail: unknown
/// stakeholder or risk references are skipped, satisfaction is clamped,
/// a repeated risk `add` is a no-op.

use tracing::debug;

use crate::arithmetic::{clamp_satisfaction, saturating_add};
use crate::domain::{
    PhaseId, ProjectRisk, ProjectState, QualityRecord, RiskStatus, TransitionOutcome,
    DOCUMENT_SOURCE,
};
use crate::effects::{ChoiceEffects, QualityImpact, RiskImpact, StakeholderImpact};
use crate::events::{DecisionEvent, Transition};

/// Where an effect is being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectContext {
    /// Phase of the decision; `None` for effects raised outside a phase
    /// (document bonuses). Used for PV accrual and as the risk source.
    pub phase: Option<PhaseId>,
    /// Whether the baseline milestone is already completed.
    pub baseline_set: bool,
    /// Whether this effect counts as one completed event for PV accrual.
    pub accrue_planned_value: bool,
}

impl EffectContext {
    pub fn decision(phase: PhaseId, baseline_set: bool) -> Self {
        Self {
            phase: Some(phase),
            baseline_set,
            accrue_planned_value: true,
        }
    }

    /// Document bonuses: no phase, EVM never tracked.
    pub fn document() -> Self {
        Self {
            phase: None,
            baseline_set: false,
            accrue_planned_value: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Apply a choice effect made during `phase`.
pub fn apply_effect(
    state: &ProjectState,
    effect: &ChoiceEffects,
    phase: PhaseId,
    baseline_set: bool,
) -> ProjectState {
    apply_effect_in(state, effect, &EffectContext::decision(phase, baseline_set)).0
}

/// General form of [`apply_effect`]; also reports what was applied.
pub fn apply_effect_in(
    state: &ProjectState,
    effect: &ChoiceEffects,
    ctx: &EffectContext,
) -> (ProjectState, TransitionOutcome) {
    let mut next = state.clone();
    let mut outcome = TransitionOutcome::default();

    merge_evm(&mut next, effect, ctx, &mut outcome);
    if let Some(quality) = &effect.quality_impact {
        merge_quality(&mut next.quality, quality);
    }
    merge_stakeholders(&mut next, &effect.stakeholder_impacts, &mut outcome);
    merge_risks(&mut next, &effect.risk_impacts, ctx, &mut outcome);

    (next, outcome)
}

/// One-time catch-up when the baseline is confirmed.
///
/// The qualitative phases are retroactively assumed to have tracked exactly
/// to plan: PV, EV and AC are all overwritten with the baseline planned
/// value, so CPI = SPI = 1 at the moment EVM tracking begins.
pub fn apply_baseline_confirmation(state: &ProjectState) -> ProjectState {
    let baseline_pv = state.constants.baseline_planned_value();
    let mut next = state.clone();
    next.planned_value = baseline_pv;
    next.earned_value = baseline_pv;
    next.actual_cost = baseline_pv;
    next.elapsed_months = state.constants.baseline_elapsed_months;
    next
}

/// Dispatch a decision event to the matching transition.
///
/// `baseline_set` is the milestone flag *before* this event.
pub fn apply_transition(
    state: &ProjectState,
    event: &DecisionEvent,
    baseline_set: bool,
) -> (ProjectState, TransitionOutcome) {
    let (next, mut outcome) = match event.transition {
        Transition::Choice => apply_effect_in(
            state,
            &event.effects,
            &EffectContext::decision(event.phase, baseline_set),
        ),
        Transition::BaselineConfirmed => {
            // The confirming decision itself is still made pre-baseline.
            let (applied, mut outcome) = apply_effect_in(
                state,
                &event.effects,
                &EffectContext::decision(event.phase, baseline_set),
            );
            let confirmed = apply_baseline_confirmation(&applied);
            outcome.baseline_confirmed = true;
            outcome.baseline_planned_value = confirmed.planned_value;
            (confirmed, outcome)
        }
        Transition::DocumentCompleted { .. } => {
            apply_effect_in(state, &event.effects, &EffectContext::document())
        }
        Transition::PhaseAdvanced | Transition::GameCompleted => {
            (state.clone(), TransitionOutcome::default())
        }
        Transition::PhaseBonus => apply_effect_in(
            state,
            &event.effects,
            &EffectContext {
                phase: Some(event.phase),
                baseline_set,
                accrue_planned_value: false,
            },
        ),
    };
    outcome.transition = event.transition.label().to_string();

    debug!(
        sequence = event.sequence,
        event_id = %event.event_id,
        transition = %outcome.transition,
        evm_tracked = outcome.evm_tracked,
        "transition applied"
    );
    (next, outcome)
}

// ---------------------------------------------------------------------------
// Merge steps (private)
// ---------------------------------------------------------------------------

fn merge_evm(
    state: &mut ProjectState,
    effect: &ChoiceEffects,
    ctx: &EffectContext,
    outcome: &mut TransitionOutcome,
) {
    if !ctx.baseline_set {
        return;
    }
    outcome.evm_tracked = true;

    state.actual_cost = saturating_add(state.actual_cost, effect.cost_impact);
    state.earned_value = saturating_add(state.earned_value, effect.earned_value_delta);
    state.elapsed_months = state.elapsed_months.saturating_add(effect.schedule_impact);

    if ctx.accrue_planned_value {
        if let Some(phase) = ctx.phase {
            let increment = state.constants.pv_per_event(phase);
            state.planned_value = saturating_add(state.planned_value, increment);
            outcome.planned_value_increment = increment;
        }
    }
}

fn merge_quality(quality: &mut QualityRecord, impact: &QualityImpact) {
    if let Some(delta) = impact.defects_found {
        quality.defects_found = saturating_add(quality.defects_found, delta);
    }
    if let Some(delta) = impact.defects_resolved {
        quality.defects_resolved = saturating_add(quality.defects_resolved, delta);
    }
    if let Some(delta) = impact.reviews_skipped {
        quality.reviews_skipped = saturating_add(quality.reviews_skipped, delta);
    }
    // Last write wins, even if it lowers coverage.
    if let Some(coverage) = impact.test_coverage {
        quality.test_coverage = coverage;
    }
}

fn merge_stakeholders(
    state: &mut ProjectState,
    impacts: &[StakeholderImpact],
    outcome: &mut TransitionOutcome,
) {
    for stakeholder in &mut state.stakeholders {
        // Only the first impact naming a stakeholder is applied.
        if let Some(impact) = impacts.iter().find(|i| i.stakeholder_id == stakeholder.id) {
            stakeholder.satisfaction =
                clamp_satisfaction(stakeholder.satisfaction.saturating_add(impact.satisfaction_delta));
        }
    }

    for impact in impacts {
        if state.stakeholder(&impact.stakeholder_id).is_none()
            && !outcome.unmatched_stakeholders.contains(&impact.stakeholder_id)
        {
            debug!(stakeholder_id = %impact.stakeholder_id, "stakeholder impact ignored: unknown id");
            outcome.unmatched_stakeholders.push(impact.stakeholder_id.clone());
        }
    }
}

fn merge_risks(
    state: &mut ProjectState,
    impacts: &[RiskImpact],
    ctx: &EffectContext,
    outcome: &mut TransitionOutcome,
) {
    for impact in impacts {
        let applied = match impact {
            RiskImpact::Add {
                risk_id,
                description,
                probability,
                impact,
                response,
            } => {
                if state.risk(risk_id).is_some() {
                    false
                } else {
                    state.risks.push(ProjectRisk {
                        id: risk_id.clone(),
                        description: description.clone().unwrap_or_default(),
                        probability: probability.unwrap_or_default(),
                        impact: impact.unwrap_or_default(),
                        status: RiskStatus::Identified,
                        response: response.clone(),
                        source: ctx
                            .phase
                            .map(|p| p.as_str())
                            .unwrap_or(DOCUMENT_SOURCE)
                            .to_string(),
                    });
                    outcome.risks_added.push(risk_id.clone());
                    true
                }
            }
            RiskImpact::Mitigate { risk_id, response } => {
                match state.risks.iter_mut().find(|r| r.id == *risk_id) {
                    Some(risk) => {
                        risk.status = RiskStatus::Mitigated;
                        if let Some(text) = response.as_ref().filter(|t| !t.is_empty()) {
                            risk.response = Some(text.clone());
                        }
                        true
                    }
                    None => false,
                }
            }
            RiskImpact::Occur { risk_id } => set_risk_status(state, risk_id, RiskStatus::Occurred),
            RiskImpact::Close { risk_id } => set_risk_status(state, risk_id, RiskStatus::Closed),
        };

        if !applied {
            debug!(
                action = impact.action(),
                risk_id = impact.risk_id(),
                "risk action skipped"
            );
            outcome
                .risk_actions_ignored
                .push(format!("{}:{}", impact.action(), impact.risk_id()));
        }
    }
}

fn set_risk_status(state: &mut ProjectState, risk_id: &str, status: RiskStatus) -> bool {
    match state.risks.iter_mut().find(|r| r.id == risk_id) {
        Some(risk) => {
            risk.status = status;
            true
        }
        None => false,
    }
}
