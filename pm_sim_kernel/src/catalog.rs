/// PM Simulator Kernel v1: Event Catalog
///
/// The authored decision points a playthrough walks through.
///
/// The catalog is static content. It is loaded from JSON, validated once,
/// and then only queried. It never touches `ProjectState`; it turns a
/// picked choice into a `DecisionEvent` for the engine.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arithmetic::{round_half_up, is_valid_id};
use crate::domain::PhaseId;
use crate::effects::{assess_choice, ChoiceEffects, ChoiceRating, DocumentType};
use crate::events::DecisionEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventChoice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub effects: ChoiceEffects,
    /// Shown after the choice is made.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feedback: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CatalogEvent {
    pub id: String,
    pub phase: PhaseId,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub order: u32,
    #[serde(default)]
    pub required: bool,
    /// Completing this event confirms the baseline.
    #[serde(default)]
    pub marks_baseline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_document: Option<DocumentType>,
    pub choices: Vec<EventChoice>,
}

impl CatalogEvent {
    pub fn choice(&self, choice_id: &str) -> Option<&EventChoice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("id {0:?} must match [a-zA-Z0-9_-]+")]
    InvalidId(String),
    #[error("event id {0:?} is listed more than once")]
    DuplicateEvent(String),
    #[error("event {event:?} lists choice {choice:?} more than once")]
    DuplicateChoice { event: String, choice: String },
    #[error("event {0:?} has no choices")]
    NoChoices(String),
    #[error("only one event may confirm the baseline; found {first:?} and {second:?}")]
    MultipleBaselineEvents { first: String, second: String },
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
    #[error("event {event:?} has no choice {choice:?}")]
    UnknownChoice { event: String, choice: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventCatalog {
    pub events: Vec<CatalogEvent>,
}

impl EventCatalog {
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let catalog: EventCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        let mut baseline: Option<&str> = None;
        for event in &self.events {
            if !is_valid_id(&event.id) {
                return Err(CatalogError::InvalidId(event.id.clone()));
            }
            if !seen.insert(event.id.as_str()) {
                return Err(CatalogError::DuplicateEvent(event.id.clone()));
            }
            if event.choices.is_empty() {
                return Err(CatalogError::NoChoices(event.id.clone()));
            }
            let mut choice_ids = BTreeSet::new();
            for choice in &event.choices {
                if !is_valid_id(&choice.id) {
                    return Err(CatalogError::InvalidId(choice.id.clone()));
                }
                if !choice_ids.insert(choice.id.as_str()) {
                    return Err(CatalogError::DuplicateChoice {
                        event: event.id.clone(),
                        choice: choice.id.clone(),
                    });
                }
            }
            if event.marks_baseline {
                if let Some(first) = baseline {
                    return Err(CatalogError::MultipleBaselineEvents {
                        first: first.to_string(),
                        second: event.id.clone(),
                    });
                }
                baseline = Some(event.id.as_str());
            }
        }
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Events of `phase`, sorted by `order` (stable on ties).
    pub fn events_by_phase(&self, phase: PhaseId) -> Vec<&CatalogEvent> {
        let mut events: Vec<&CatalogEvent> =
            self.events.iter().filter(|e| e.phase == phase).collect();
        events.sort_by_key(|e| e.order);
        events
    }

    pub fn event(&self, event_id: &str) -> Option<&CatalogEvent> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn choice(&self, event_id: &str, choice_id: &str) -> Option<&EventChoice> {
        self.event(event_id).and_then(|e| e.choice(choice_id))
    }

    pub fn event_count(&self, phase: PhaseId) -> usize {
        self.events.iter().filter(|e| e.phase == phase).count()
    }

    pub fn baseline_event(&self) -> Option<&CatalogEvent> {
        self.events.iter().find(|e| e.marks_baseline)
    }

    /// First event of `phase` (by order) not yet completed.
    pub fn next_event(&self, phase: PhaseId, completed: &BTreeSet<String>) -> Option<&CatalogEvent> {
        self.events_by_phase(phase)
            .into_iter()
            .find(|e| !completed.contains(&e.id))
    }

    fn completed_in_phase(&self, phase: PhaseId, completed: &BTreeSet<String>) -> usize {
        self.events
            .iter()
            .filter(|e| e.phase == phase && completed.contains(&e.id))
            .count()
    }

    /// Completed share of the phase's events as a rounded percentage.
    /// A phase with no events reports 0.
    pub fn phase_progress(&self, phase: PhaseId, completed: &BTreeSet<String>) -> u32 {
        let total = self.event_count(phase);
        if total == 0 {
            return 0;
        }
        let done = self.completed_in_phase(phase, completed);
        round_half_up(done as f64 / total as f64 * 100.0) as u32
    }

    /// All required events of the phase are completed.
    pub fn is_phase_complete(&self, phase: PhaseId, completed: &BTreeSet<String>) -> bool {
        self.events
            .iter()
            .filter(|e| e.phase == phase && e.required)
            .all(|e| completed.contains(&e.id))
    }

    // ── Decisions ──────────────────────────────────────────────────

    /// Build the decision event for picking `choice_id` at `event_id`.
    pub fn decision_for(
        &self,
        sequence: u64,
        event_id: &str,
        choice_id: &str,
    ) -> Result<DecisionEvent, CatalogError> {
        let event = self
            .event(event_id)
            .ok_or_else(|| CatalogError::UnknownEvent(event_id.to_string()))?;
        let choice = event.choice(choice_id).ok_or_else(|| CatalogError::UnknownChoice {
            event: event_id.to_string(),
            choice: choice_id.to_string(),
        })?;
        let effects = choice.effects.clone();
        Ok(if event.marks_baseline {
            DecisionEvent::baseline_confirmed(sequence, event.phase, &event.id, &choice.id, effects)
        } else {
            DecisionEvent::choice(sequence, event.phase, &event.id, &choice.id, effects)
        })
    }

    /// Phase-completion bonus event for `phase`, sized by how many of its
    /// events are done.
    pub fn phase_bonus(
        &self,
        sequence: u64,
        phase: PhaseId,
        completed: &BTreeSet<String>,
        sponsor_id: &str,
    ) -> DecisionEvent {
        let done = self.completed_in_phase(phase, completed) as u32;
        let total = self.event_count(phase) as u32;
        DecisionEvent::phase_bonus(sequence, phase, done, total, sponsor_id)
    }

    /// Rate a choice against the other options of its event.
    pub fn assess(&self, event_id: &str, choice_id: &str) -> Result<ChoiceRating, CatalogError> {
        let event = self
            .event(event_id)
            .ok_or_else(|| CatalogError::UnknownEvent(event_id.to_string()))?;
        let chosen = event.choice(choice_id).ok_or_else(|| CatalogError::UnknownChoice {
            event: event_id.to_string(),
            choice: choice_id.to_string(),
        })?;
        let options: Vec<&ChoiceEffects> = event.choices.iter().map(|c| &c.effects).collect();
        Ok(assess_choice(&chosen.effects, &options))
    }
}
