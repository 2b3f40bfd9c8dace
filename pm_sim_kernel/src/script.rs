/// PM Simulator Kernel v1: Scripted Playthroughs
///
/// A list of player actions resolved against the catalog and fed
/// to the engine. Used by the harness binary and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, EventCatalog};
use crate::effects::DocumentType;
use crate::engine::{EngineError, GameProgress, SimulationEngine};
use crate::events::DecisionEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum ScriptStep {
    /// Pick a choice at a catalog event.
    #[serde(rename_all = "camelCase")]
    Choose { event_id: String, choice_id: String },
    /// Complete a project document in the current phase.
    Document { document: DocumentType },
    /// Explicitly move on to the next phase.
    Advance,
    /// Claim the completion bonus for the current phase.
    PhaseBonus,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("malformed script JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("step {index}: {source}")]
    Catalog {
        index: usize,
        #[source]
        source: CatalogError,
    },
    #[error("step {index}: {source}")]
    Engine {
        index: usize,
        #[source]
        source: EngineError,
    },
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    Ok(serde_json::from_str(json)?)
}

impl ScriptStep {
    /// The decision this step produces, or `None` when the step is a no-op
    /// (advancing past the last phase).
    pub fn to_decision(
        &self,
        catalog: &EventCatalog,
        progress: &GameProgress,
        sequence: u64,
    ) -> Result<Option<DecisionEvent>, CatalogError> {
        let decision = match self {
            ScriptStep::Choose { event_id, choice_id } => {
                catalog.decision_for(sequence, event_id, choice_id)?
            }
            ScriptStep::Document { document } => {
                DecisionEvent::document_completed(sequence, progress.current_phase, *document)
            }
            ScriptStep::PhaseBonus => catalog.phase_bonus(
                sequence,
                progress.current_phase,
                &progress.completed_events,
                &progress.state.constants.sponsor_id,
            ),
            ScriptStep::Advance => {
                let current = progress.current_phase;
                return Ok(current
                    .next()
                    .map(|_| DecisionEvent::phase_advanced(sequence, current)));
            }
        };
        Ok(Some(decision))
    }
}

/// Play `steps` on `engine`. Returns the decision log that was applied,
/// suitable for replay.
pub fn run_script(
    engine: &mut SimulationEngine,
    catalog: &EventCatalog,
    steps: &[ScriptStep],
) -> Result<Vec<DecisionEvent>, ScriptError> {
    let mut applied = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        let decision = step
            .to_decision(catalog, engine.progress(), engine.next_sequence())
            .map_err(|source| ScriptError::Catalog { index, source })?;
        if let Some(decision) = decision {
            engine
                .apply_decision(&decision)
                .map_err(|source| ScriptError::Engine { index, source })?;
            applied.push(decision);
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PhaseId;
    use crate::events::Transition;
    use crate::scenario::Scenario;

    #[test]
    fn test_parse_steps() {
        let steps = parse_script(
            r#"[{"step": "choose", "eventId": "init-1", "choiceId": "init-1-a"},
                {"step": "document", "document": "risk-register"},
                {"step": "advance"},
                {"step": "phase-bonus"}]"#,
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptStep::Choose {
                    event_id: "init-1".to_string(),
                    choice_id: "init-1-a".to_string()
                },
                ScriptStep::Document {
                    document: DocumentType::RiskRegister
                },
                ScriptStep::Advance,
                ScriptStep::PhaseBonus,
            ]
        );
    }

    #[test]
    fn test_unknown_choice_reports_step_index() {
        let catalog = EventCatalog::default();
        let mut engine = SimulationEngine::new(Scenario::default());
        let steps = vec![
            ScriptStep::Advance,
            ScriptStep::Choose {
                event_id: "missing".to_string(),
                choice_id: "x".to_string(),
            },
        ];
        let err = run_script(&mut engine, &catalog, &steps).unwrap_err();
        assert!(matches!(err, ScriptError::Catalog { index: 1, .. }));
        assert_eq!(engine.progress().current_phase, PhaseId::PreRequirements);
    }

    #[test]
    fn test_document_step_uses_current_phase() {
        let catalog = EventCatalog::default();
        let mut engine = SimulationEngine::new(Scenario::default());
        let steps = vec![
            ScriptStep::Advance,
            ScriptStep::Document {
                document: DocumentType::Wbs,
            },
        ];
        let log = run_script(&mut engine, &catalog, &steps).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].transition, Transition::PhaseAdvanced);
        assert_eq!(log[1].phase, PhaseId::PreRequirements);
        assert_eq!(log[1].sequence, 2);
        assert_eq!(engine.progress().documents_completed(), 1);
    }

    #[test]
    fn test_advance_at_closing_is_a_no_op() {
        let catalog = EventCatalog::default();
        let mut engine = SimulationEngine::new(Scenario::default());
        let steps = vec![ScriptStep::Advance; 9];
        let log = run_script(&mut engine, &catalog, &steps).unwrap();
        assert_eq!(log.len(), 7);
        assert_eq!(engine.progress().current_phase, PhaseId::Closing);
    }
}
