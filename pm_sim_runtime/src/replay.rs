//! Replay orchestrator: rebuild state from a decision log.
//!
//! Delegates all domain logic to the kernel engine.
//! No shortcuts, no cached state logic.

use pm_sim_kernel::domain::ProjectState;
use pm_sim_kernel::engine::{EngineError, GameProgress, SimulationEngine};
use pm_sim_kernel::events::DecisionEvent;
use pm_sim_kernel::hashing::canonical_hash;
use pm_sim_kernel::invariants::ValidationMode;
use pm_sim_kernel::scenario::Scenario;

/// Rebuild the full game progress from a decision log.
///
/// 1. Create a fresh engine for the scenario
/// 2. Pass each decision sequentially to the kernel
/// 3. Return the progress and the last applied sequence
pub fn rebuild_progress(
    scenario: &Scenario,
    events: &[DecisionEvent],
    mode: ValidationMode,
) -> Result<(GameProgress, u64), EngineError> {
    let mut engine = SimulationEngine::new(scenario.clone()).with_validation(mode);
    engine.apply_sequence(events)?;
    Ok((engine.progress().clone(), engine.last_sequence()))
}

/// Rebuild the project state from a decision log.
///
/// Returns `(final_state, canonical_hash)`. A pure function on the event
/// stream, deterministic by the kernel's guarantee.
pub fn rebuild_state(
    scenario: &Scenario,
    events: &[DecisionEvent],
    mode: ValidationMode,
) -> Result<(ProjectState, String), EngineError> {
    let (progress, _) = rebuild_progress(scenario, events, mode)?;
    let hash = canonical_hash(&progress.state);
    Ok((progress.state, hash))
}

/// Rebuild state and return only the canonical hash.
pub fn rebuild_hash(
    scenario: &Scenario,
    events: &[DecisionEvent],
    mode: ValidationMode,
) -> Result<String, EngineError> {
    let (_, hash) = rebuild_state(scenario, events, mode)?;
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_sim_kernel::domain::PhaseId;
    use pm_sim_kernel::effects::{ChoiceEffects, DocumentType};

    fn log() -> Vec<DecisionEvent> {
        vec![
            DecisionEvent::choice(1, PhaseId::Initiation, "init-1", "init-1-a", ChoiceEffects::default().with_stakeholder("takayama", 1)),
            DecisionEvent::document_completed(2, PhaseId::Initiation, DocumentType::Charter),
            DecisionEvent::baseline_confirmed(3, PhaseId::Estimation, "est-3", "est-3-a", ChoiceEffects::default()),
        ]
    }

    #[test]
    fn test_empty_log_is_initial_state() {
        let scenario = Scenario::default();
        let (state, hash) = rebuild_state(&scenario, &[], ValidationMode::Permissive).unwrap();
        assert_eq!(state.actual_cost, 0);
        assert_eq!(hash, canonical_hash(&SimulationEngine::new(scenario).progress().state));
    }

    #[test]
    fn test_rebuild_matches_live_engine() {
        let scenario = Scenario::default();
        let mut engine = SimulationEngine::new(scenario.clone());
        engine.apply_sequence(&log()).unwrap();
        let (progress, last) = rebuild_progress(&scenario, &log(), ValidationMode::Permissive).unwrap();
        assert_eq!(&progress, engine.progress());
        assert_eq!(last, 3);
        assert_eq!(
            rebuild_hash(&scenario, &log(), ValidationMode::Permissive).unwrap(),
            canonical_hash(engine.state())
        );
    }

    #[test]
    fn test_rebuild_honours_validation_mode() {
        // The lessons-learned bonus resolves defects that were never found.
        let events = vec![DecisionEvent::document_completed(1, PhaseId::Closing, DocumentType::LessonsLearned)];
        let scenario = Scenario::default();
        assert!(rebuild_state(&scenario, &events, ValidationMode::Permissive).is_ok());
        assert!(matches!(
            rebuild_state(&scenario, &events, ValidationMode::Strict),
            Err(EngineError::Invariant(_))
        ));
    }

    #[test]
    fn test_broken_log_surfaces_engine_error() {
        let mut events = log();
        events.remove(1);
        assert_eq!(
            rebuild_hash(&Scenario::default(), &events, ValidationMode::Permissive),
            Err(EngineError::Sequence { expected: 2, found: 3 })
        );
    }
}
