/// PM Simulator Kernel v1: Engine
///
/// Top-level orchestrator. Delegates mutation to transitions,
/// validates via invariants.
///
/// Strict sequence enforcement, forward-only phases, baseline at most once.
/// A rejected decision leaves the engine untouched. Phase advances and game
/// completion are logged as marker decisions, so a replay of the log rebuilds
/// the whole GameProgress.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{PhaseId, ProjectState, TransitionOutcome};
use crate::effects::DocumentType;
use crate::events::{DecisionEvent, Transition, SCHEMA_VERSION};
use crate::feedback::{final_report, FinalReport};
use crate::invariants::{validate_invariants, InvariantViolation, ValidationMode};
use crate::scenario::Scenario;
use crate::state::create_initial_state;
use crate::transitions::apply_transition;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("game is already completed")]
    GameCompleted,
    #[error("schema version mismatch: expected {expected}, got {found}")]
    SchemaVersion { expected: u32, found: u32 },
    #[error("sequence violation: expected {expected}, got {found}")]
    Sequence { expected: u64, found: u64 },
    #[error("decision for phase {found} arrived after the project moved on to {current}")]
    PhaseRegression { current: PhaseId, found: PhaseId },
    #[error("event {0:?} was already completed")]
    DuplicateEvent(String),
    #[error("document {0} was already completed")]
    DuplicateDocument(DocumentType),
    #[error("baseline is already confirmed")]
    BaselineAlreadyConfirmed,
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// One line of the decision history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub sequence: u64,
    pub phase: PhaseId,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_id: Option<String>,
    pub transition: String,
}

/// Everything a playthrough has accumulated so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GameProgress {
    pub state: ProjectState,
    pub current_phase: PhaseId,
    pub completed_events: BTreeSet<String>,
    pub completed_documents: BTreeSet<DocumentType>,
    pub baseline_set: bool,
    pub completed: bool,
    pub log: Vec<LogEntry>,
}

impl GameProgress {
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            state: create_initial_state(scenario),
            current_phase: PhaseId::Initiation,
            completed_events: BTreeSet::new(),
            completed_documents: BTreeSet::new(),
            baseline_set: false,
            completed: false,
            log: Vec::new(),
        }
    }

    pub fn documents_completed(&self) -> u32 {
        self.completed_documents.len() as u32
    }
}

/// Stateful engine wrapping the pure functional transition layer.
pub struct SimulationEngine {
    scenario: Scenario,
    progress: GameProgress,
    last_sequence: u64,
    mode: ValidationMode,
}

impl SimulationEngine {
    pub fn new(scenario: Scenario) -> Self {
        let progress = GameProgress::new(&scenario);
        Self {
            scenario,
            progress,
            last_sequence: 0,
            mode: ValidationMode::default(),
        }
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resume from previously captured progress. The progress is checked
    /// against the invariants before it is accepted.
    pub fn from_progress(
        scenario: Scenario,
        progress: GameProgress,
        last_sequence: u64,
        mode: ValidationMode,
    ) -> Result<Self, EngineError> {
        validate_invariants(&progress.state, progress.baseline_set, mode)?;
        Ok(Self {
            scenario,
            progress,
            last_sequence,
            mode,
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn progress(&self) -> &GameProgress {
        &self.progress
    }

    pub fn state(&self) -> &ProjectState {
        &self.progress.state
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.mode
    }

    /// Discard all progress and start the scenario over.
    pub fn reset(&mut self) {
        self.progress = GameProgress::new(&self.scenario);
        self.last_sequence = 0;
    }

    /// Apply a single decision:
    ///   1. Reject if the game is completed
    ///   2. Validate schema version (must be 1)
    ///   3. Validate sequence (strictly increasing, no gaps)
    ///   4. Validate phase (never backwards; a later phase advances)
    ///   5. Reject duplicates (event, document, baseline)
    ///   6. Delegate to transitions::apply_transition
    ///   7. Validate invariants on the new state
    ///   8. Commit
    pub fn apply_decision(&mut self, event: &DecisionEvent) -> Result<TransitionOutcome, EngineError> {
        if let Err(err) = self.check_envelope(event) {
            warn!(sequence = event.sequence, event_id = %event.event_id, error = %err, "decision rejected");
            return Err(err);
        }

        let (new_state, outcome) =
            apply_transition(&self.progress.state, event, self.progress.baseline_set);
        let baseline_set = self.progress.baseline_set || outcome.baseline_confirmed;
        if let Err(violation) = validate_invariants(&new_state, baseline_set, self.mode) {
            warn!(sequence = event.sequence, error = %violation, "decision rejected");
            return Err(violation.into());
        }

        if event.phase > self.progress.current_phase {
            info!(from = %self.progress.current_phase, to = %event.phase, "phase advanced");
            self.progress.current_phase = event.phase;
        }
        if outcome.baseline_confirmed {
            info!(
                sequence = event.sequence,
                planned_value = outcome.baseline_planned_value,
                "baseline confirmed; EVM tracking started"
            );
        }
        match event.transition {
            Transition::DocumentCompleted { document } => {
                self.progress.completed_documents.insert(document);
            }
            Transition::PhaseAdvanced => {
                if let Some(next) = self.progress.current_phase.next() {
                    info!(from = %self.progress.current_phase, to = %next, "phase advanced");
                    self.progress.current_phase = next;
                }
            }
            Transition::GameCompleted => {
                self.progress.completed = true;
                info!(decisions = self.progress.log.len() + 1, "game completed");
            }
            _ => {}
        }
        self.progress.completed_events.insert(event.event_id.clone());
        self.progress.log.push(LogEntry {
            sequence: event.sequence,
            phase: event.phase,
            event_id: event.event_id.clone(),
            choice_id: event.choice_id.clone(),
            transition: outcome.transition.clone(),
        });
        self.progress.state = new_state;
        self.progress.baseline_set = baseline_set;
        self.last_sequence = event.sequence;

        Ok(outcome)
    }

    fn check_envelope(&self, event: &DecisionEvent) -> Result<(), EngineError> {
        if self.progress.completed {
            return Err(EngineError::GameCompleted);
        }
        if event.schema_version != SCHEMA_VERSION {
            return Err(EngineError::SchemaVersion {
                expected: SCHEMA_VERSION,
                found: event.schema_version,
            });
        }
        let expected = self.next_sequence();
        if event.sequence != expected {
            return Err(EngineError::Sequence {
                expected,
                found: event.sequence,
            });
        }
        if event.phase < self.progress.current_phase {
            return Err(EngineError::PhaseRegression {
                current: self.progress.current_phase,
                found: event.phase,
            });
        }
        match event.transition {
            Transition::DocumentCompleted { document } => {
                if self.progress.completed_documents.contains(&document) {
                    return Err(EngineError::DuplicateDocument(document));
                }
            }
            Transition::BaselineConfirmed if self.progress.baseline_set => {
                return Err(EngineError::BaselineAlreadyConfirmed);
            }
            _ => {}
        }
        if self.progress.completed_events.contains(&event.event_id) {
            return Err(EngineError::DuplicateEvent(event.event_id.clone()));
        }
        Ok(())
    }

    /// Marker decision for leaving the current phase; `None` at the last
    /// phase.
    pub fn phase_advance_decision(&self) -> Option<DecisionEvent> {
        let current = self.progress.current_phase;
        current
            .next()
            .map(|_| DecisionEvent::phase_advanced(self.next_sequence(), current))
    }

    pub fn completion_decision(&self) -> DecisionEvent {
        DecisionEvent::game_completed(self.next_sequence(), self.progress.current_phase)
    }

    /// Move to the next phase. No-op at the last phase; returns the phase
    /// the engine is in afterwards.
    pub fn advance_phase(&mut self) -> Result<PhaseId, EngineError> {
        if let Some(decision) = self.phase_advance_decision() {
            self.apply_decision(&decision)?;
        }
        Ok(self.progress.current_phase)
    }

    /// Mark the game completed and produce the final report. Further
    /// decisions are rejected; completing twice returns the same report.
    pub fn complete_game(&mut self) -> Result<FinalReport, EngineError> {
        if !self.progress.completed {
            let decision = self.completion_decision();
            self.apply_decision(&decision)?;
        }
        Ok(self.report())
    }

    /// Report for the current state. Does not end the game.
    pub fn report(&self) -> FinalReport {
        final_report(&self.progress.state, self.progress.documents_completed())
    }

    /// Apply an ordered sequence of decisions on top of the current progress.
    pub fn apply_sequence(&mut self, events: &[DecisionEvent]) -> Result<&ProjectState, EngineError> {
        for event in events {
            self.apply_decision(event)?;
        }
        Ok(self.state())
    }

    /// Event-sourced reconstruction: reset and replay.
    pub fn replay(&mut self, events: &[DecisionEvent]) -> Result<&ProjectState, EngineError> {
        self.reset();
        info!(events = events.len(), "replaying decision log");
        self.apply_sequence(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ChoiceEffects;

    fn engine() -> SimulationEngine {
        SimulationEngine::new(Scenario::default())
    }

    fn choice(seq: u64, phase: PhaseId, id: &str) -> DecisionEvent {
        DecisionEvent::choice(seq, phase, id, &format!("{id}-a"), ChoiceEffects::default().with_earned_value(10))
    }

    #[test]
    fn test_sequence_must_start_at_one() {
        let mut engine = engine();
        let err = engine.apply_decision(&choice(2, PhaseId::Initiation, "init-1")).unwrap_err();
        assert_eq!(err, EngineError::Sequence { expected: 1, found: 2 });
        assert_eq!(engine.last_sequence(), 0);
    }

    #[test]
    fn test_sequence_gap_rejected() {
        let mut engine = engine();
        engine.apply_decision(&choice(1, PhaseId::Initiation, "init-1")).unwrap();
        let err = engine.apply_decision(&choice(3, PhaseId::Initiation, "init-2")).unwrap_err();
        assert_eq!(err, EngineError::Sequence { expected: 2, found: 3 });
    }

    #[test]
    fn test_schema_version_enforced() {
        let mut engine = engine();
        let mut event = choice(1, PhaseId::Initiation, "init-1");
        event.schema_version = 2;
        assert_eq!(
            engine.apply_decision(&event),
            Err(EngineError::SchemaVersion { expected: 1, found: 2 })
        );
    }

    #[test]
    fn test_duplicate_event_rejected() {
        let mut engine = engine();
        engine.apply_decision(&choice(1, PhaseId::Initiation, "init-1")).unwrap();
        assert_eq!(
            engine.apply_decision(&choice(2, PhaseId::Initiation, "init-1")),
            Err(EngineError::DuplicateEvent("init-1".to_string()))
        );
    }

    #[test]
    fn test_phase_advances_and_never_regresses() {
        let mut engine = engine();
        engine.apply_decision(&choice(1, PhaseId::RomPlanning, "rom-1")).unwrap();
        assert_eq!(engine.progress().current_phase, PhaseId::RomPlanning);
        assert_eq!(
            engine.apply_decision(&choice(2, PhaseId::Initiation, "init-1")),
            Err(EngineError::PhaseRegression {
                current: PhaseId::RomPlanning,
                found: PhaseId::Initiation
            })
        );
    }

    #[test]
    fn test_advance_phase_stops_at_closing() {
        let mut engine = engine();
        for _ in 0..10 {
            engine.advance_phase().unwrap();
        }
        assert_eq!(engine.progress().current_phase, PhaseId::Closing);
        assert_eq!(engine.advance_phase().unwrap(), PhaseId::Closing);
        // Seven markers, one per phase left behind.
        assert_eq!(engine.last_sequence(), 7);
        assert!(engine.phase_advance_decision().is_none());
    }

    #[test]
    fn test_replay_restores_phase_and_completion() {
        let mut engine = engine();
        let log = vec![
            DecisionEvent::document_completed(1, PhaseId::Initiation, DocumentType::Charter),
            DecisionEvent::phase_advanced(2, PhaseId::Initiation),
            DecisionEvent::phase_advanced(3, PhaseId::PreRequirements),
            DecisionEvent::game_completed(4, PhaseId::RomPlanning),
        ];
        engine.apply_sequence(&log).unwrap();
        let before = engine.progress().clone();
        assert_eq!(before.current_phase, PhaseId::RomPlanning);
        assert!(before.completed);

        engine.replay(&log).unwrap();
        assert_eq!(engine.progress(), &before);
        let late = DecisionEvent::document_completed(5, PhaseId::RomPlanning, DocumentType::Wbs);
        assert_eq!(engine.apply_decision(&late), Err(EngineError::GameCompleted));
    }

    #[test]
    fn test_phase_marker_twice_rejected() {
        let mut engine = engine();
        engine.apply_decision(&DecisionEvent::phase_advanced(1, PhaseId::Initiation)).unwrap();
        assert_eq!(
            engine.apply_decision(&DecisionEvent::phase_advanced(2, PhaseId::Initiation)),
            Err(EngineError::PhaseRegression {
                current: PhaseId::PreRequirements,
                found: PhaseId::Initiation
            })
        );
    }

    #[test]
    fn test_baseline_confirmed_once() {
        let mut engine = engine();
        let baseline = DecisionEvent::baseline_confirmed(1, PhaseId::Estimation, "est-3", "est-3-a", ChoiceEffects::default());
        let outcome = engine.apply_decision(&baseline).unwrap();
        assert!(outcome.baseline_confirmed);
        assert!(engine.progress().baseline_set);
        assert_eq!(engine.state().planned_value, 2002);

        let again = DecisionEvent::baseline_confirmed(2, PhaseId::Estimation, "est-4", "est-4-a", ChoiceEffects::default());
        assert_eq!(engine.apply_decision(&again), Err(EngineError::BaselineAlreadyConfirmed));
    }

    #[test]
    fn test_document_counted_once() {
        let mut engine = engine();
        let doc = DecisionEvent::document_completed(1, PhaseId::Initiation, DocumentType::Charter);
        engine.apply_decision(&doc).unwrap();
        assert_eq!(engine.progress().documents_completed(), 1);
        let again = DecisionEvent::document_completed(2, PhaseId::Initiation, DocumentType::Charter);
        assert_eq!(
            engine.apply_decision(&again),
            Err(EngineError::DuplicateDocument(DocumentType::Charter))
        );
    }

    #[test]
    fn test_strict_mode_rejects_over_resolution_without_committing() {
        let mut engine = engine().with_validation(ValidationMode::Strict);
        let doc = DecisionEvent::document_completed(1, PhaseId::Closing, DocumentType::LessonsLearned);
        let err = engine.apply_decision(&doc).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(InvariantViolation::ResolvedExceedsFound { .. })));
        assert_eq!(engine.last_sequence(), 0);
        assert_eq!(engine.state().quality.defects_resolved, 0);
        assert_eq!(engine.progress().current_phase, PhaseId::Initiation);
    }

    #[test]
    fn test_completed_game_rejects_decisions() {
        let mut engine = engine();
        let report = engine.complete_game().unwrap();
        assert_eq!(report.categories.len(), 6);
        assert_eq!(engine.last_sequence(), 1);
        assert_eq!(engine.complete_game().unwrap(), report);
        assert_eq!(
            engine.apply_decision(&choice(1, PhaseId::Initiation, "init-1")),
            Err(EngineError::GameCompleted)
        );
    }

    #[test]
    fn test_replay_resets_first() {
        let mut engine = engine();
        let events = vec![
            choice(1, PhaseId::Initiation, "init-1"),
            choice(2, PhaseId::Initiation, "init-2"),
        ];
        engine.apply_sequence(&events).unwrap();
        let first = engine.state().clone();
        let replayed = engine.replay(&events).unwrap().clone();
        assert_eq!(first, replayed);
        assert_eq!(engine.last_sequence(), 2);
        assert_eq!(engine.progress().log.len(), 2);
    }

    #[test]
    fn test_from_progress_validates() {
        let mut progress = GameProgress::new(&Scenario::default());
        progress.state.stakeholders[0].satisfaction = 9;
        let result = SimulationEngine::from_progress(Scenario::default(), progress, 0, ValidationMode::Permissive);
        assert!(matches!(
            result,
            Err(EngineError::Invariant(InvariantViolation::SatisfactionOutOfRange { .. }))
        ));
    }
}
