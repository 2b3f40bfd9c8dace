/// PM Simulator Kernel v1: Decision Events
///
/// A decision event is one committed user action: the envelope around an
/// effect. It carries intent and payload only; the reducer owns the logic.
///
/// Schema version is locked at 1. Events with schema_version != 1
/// are rejected by the engine.

use serde::{Deserialize, Serialize};

use crate::domain::PhaseId;
use crate::effects::{document_completion_bonus, phase_completion_bonus, ChoiceEffects, DocumentType};

/// Schema version for v1 kernel events. Hardcoded, never changes.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// The named state-machine transition a decision event triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Transition {
    /// A regular choice at a decision point.
    Choice,
    /// The decision that freezes the baseline and starts EVM tracking.
    BaselineConfirmed,
    /// A project document was completed; never touches EVM.
    DocumentCompleted { document: DocumentType },
    /// Bonus for finishing a phase; accrues EV but no planned value.
    PhaseBonus,
    /// The player moved on from `phase` to the next phase. No state change.
    PhaseAdvanced,
    /// The game was ended; later decisions are rejected. No state change.
    GameCompleted,
}

impl Transition {
    pub fn label(self) -> &'static str {
        match self {
            Transition::Choice => "choice",
            Transition::BaselineConfirmed => "baseline-confirmed",
            Transition::DocumentCompleted { .. } => "document-completed",
            Transition::PhaseBonus => "phase-bonus",
            Transition::PhaseAdvanced => "phase-advanced",
            Transition::GameCompleted => "game-completed",
        }
    }

    /// Progress markers are logged and replayed but never touch ProjectState.
    pub fn is_marker(self) -> bool {
        matches!(self, Transition::PhaseAdvanced | Transition::GameCompleted)
    }
}

/// Event envelope: one entry of the replayable decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEvent {
    pub sequence: u64,
    pub phase: PhaseId,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_id: Option<String>,
    pub transition: Transition,
    pub effects: ChoiceEffects,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

impl DecisionEvent {
    pub fn choice(
        sequence: u64,
        phase: PhaseId,
        event_id: &str,
        choice_id: &str,
        effects: ChoiceEffects,
    ) -> Self {
        Self {
            sequence,
            phase,
            event_id: event_id.to_string(),
            choice_id: Some(choice_id.to_string()),
            transition: Transition::Choice,
            effects,
            schema_version: SCHEMA_VERSION,
        }
    }

    pub fn baseline_confirmed(
        sequence: u64,
        phase: PhaseId,
        event_id: &str,
        choice_id: &str,
        effects: ChoiceEffects,
    ) -> Self {
        Self {
            transition: Transition::BaselineConfirmed,
            ..Self::choice(sequence, phase, event_id, choice_id, effects)
        }
    }

    /// Document completion; the effect is the fixed bonus for that document.
    pub fn document_completed(sequence: u64, phase: PhaseId, document: DocumentType) -> Self {
        Self {
            sequence,
            phase,
            event_id: format!("document:{}", document),
            choice_id: None,
            transition: Transition::DocumentCompleted { document },
            effects: document_completion_bonus(document),
            schema_version: SCHEMA_VERSION,
        }
    }

    pub fn phase_bonus(
        sequence: u64,
        phase: PhaseId,
        completed: u32,
        total: u32,
        sponsor_id: &str,
    ) -> Self {
        Self {
            sequence,
            phase,
            event_id: format!("phase-bonus:{}", phase),
            choice_id: None,
            transition: Transition::PhaseBonus,
            effects: phase_completion_bonus(completed, total, sponsor_id),
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Marker for leaving `phase`. One per phase, so the event id is keyed
    /// by the phase being left.
    pub fn phase_advanced(sequence: u64, phase: PhaseId) -> Self {
        Self::marker(sequence, phase, format!("phase-advance:{}", phase), Transition::PhaseAdvanced)
    }

    pub fn game_completed(sequence: u64, phase: PhaseId) -> Self {
        Self::marker(sequence, phase, "game-completed".to_string(), Transition::GameCompleted)
    }

    fn marker(sequence: u64, phase: PhaseId, event_id: String, transition: Transition) -> Self {
        Self {
            sequence,
            phase,
            event_id,
            choice_id: None,
            transition,
            effects: ChoiceEffects::default(),
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Parse a JSON array of decision events (a stored decision log).
    pub fn parse_log(json: &str) -> Result<Vec<DecisionEvent>, serde_json::Error> {
        serde_json::from_str(json)
    }
}
