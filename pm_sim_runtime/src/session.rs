//! Session manager: one playthrough with persist-after-apply semantics.
//!
//! Each session owns an engine and a repository handle. Single writer:
//! every mutating call takes `&mut self`.
//!
//! Apply-before-persist order:
//!   1. engine.apply_decision(event)   rejected decisions stop here
//!   2. repository.append_event()      only if step 1 succeeded
//!   3. snapshot if interval reached   failure is logged, not returned
//!
//! Phase advances and completion are persisted as marker decisions, so the
//! stored log alone rebuilds the full GameProgress.

use thiserror::Error;
use tracing::{info, warn};

use pm_sim_kernel::catalog::{CatalogError, EventCatalog};
use pm_sim_kernel::domain::{PhaseId, ProjectState, TransitionOutcome};
use pm_sim_kernel::effects::DocumentType;
use pm_sim_kernel::engine::{EngineError, GameProgress, SimulationEngine};
use pm_sim_kernel::events::DecisionEvent;
use pm_sim_kernel::feedback::FinalReport;
use pm_sim_kernel::hashing::canonical_hash;
use pm_sim_kernel::invariants::ValidationMode;
use pm_sim_kernel::scenario::Scenario;

use crate::replay;
use crate::repository::{RepositoryError, SessionRepository};
use crate::snapshot_codec::{encode_snapshot, restore_snapshot, take_snapshot, SnapshotError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Session tuning. `snapshot_interval == 0` disables periodic snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub snapshot_interval: u64,
    pub validation: ValidationMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            snapshot_interval: 10,
            validation: ValidationMode::Permissive,
        }
    }
}

/// An isolated simulation session backed by a repository.
pub struct Session<R: SessionRepository> {
    session_id: String,
    repository: R,
    engine: SimulationEngine,
    options: SessionOptions,
}

impl<R: SessionRepository> Session<R> {
    /// Register a new session for `scenario` and start it from the initial
    /// state.
    pub fn create(
        mut repository: R,
        session_id: &str,
        scenario: Scenario,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        repository.create(session_id, &scenario)?;
        info!(session = session_id, scenario = %scenario.id, "session started");
        Ok(Self {
            session_id: session_id.to_string(),
            repository,
            engine: SimulationEngine::new(scenario).with_validation(options.validation),
            options,
        })
    }

    /// Reopen an existing session.
    ///
    /// Restores from the latest snapshot and replays the decisions after it.
    /// A snapshot that fails verification is skipped and the whole log is
    /// replayed instead.
    pub fn open(repository: R, session_id: &str, options: SessionOptions) -> Result<Self, SessionError> {
        let scenario = repository.scenario(session_id)?;
        let events = repository.load_events(session_id)?;

        let restored = match repository.latest_snapshot(session_id)? {
            Some(stored) => match restore_snapshot(&stored.encoded, options.validation) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!(session = session_id, sequence = stored.sequence, error = %err, "snapshot rejected; replaying full log");
                    None
                }
            },
            None => None,
        };

        let engine = match restored {
            Some(snapshot) => {
                let mut engine = SimulationEngine::from_progress(
                    scenario,
                    snapshot.progress,
                    snapshot.sequence,
                    options.validation,
                )?;
                let tail: Vec<DecisionEvent> = events
                    .into_iter()
                    .filter(|e| e.sequence > snapshot.sequence)
                    .collect();
                engine.apply_sequence(&tail)?;
                info!(session = session_id, snapshot = snapshot.sequence, tail = tail.len(), "session restored from snapshot");
                engine
            }
            None => {
                let mut engine = SimulationEngine::new(scenario).with_validation(options.validation);
                engine.replay(&events)?;
                engine
            }
        };

        Ok(Self {
            session_id: session_id.to_string(),
            repository,
            engine,
            options,
        })
    }

    /// Apply a single decision: validate via the kernel, then persist.
    pub fn apply(&mut self, event: &DecisionEvent) -> Result<TransitionOutcome, SessionError> {
        // Step 1: kernel
        let outcome = self.engine.apply_decision(event)?;

        // Step 2: persist (only if step 1 succeeded)
        self.repository.append_event(&self.session_id, event)?;

        // Step 3: auto-snapshot at interval. The decision is already
        // committed; a missing snapshot only costs a longer replay on open.
        if self.options.snapshot_interval > 0 && event.sequence % self.options.snapshot_interval == 0 {
            if let Err(err) = self.save_snapshot() {
                warn!(session = %self.session_id, sequence = event.sequence, error = %err, "snapshot not saved");
            }
        }

        Ok(outcome)
    }

    /// Pick `choice_id` at catalog event `event_id`.
    pub fn choose(
        &mut self,
        catalog: &EventCatalog,
        event_id: &str,
        choice_id: &str,
    ) -> Result<TransitionOutcome, SessionError> {
        let decision = catalog.decision_for(self.engine.next_sequence(), event_id, choice_id)?;
        self.apply(&decision)
    }

    /// Record a completed project document in the current phase.
    pub fn complete_document(&mut self, document: DocumentType) -> Result<TransitionOutcome, SessionError> {
        let decision = DecisionEvent::document_completed(
            self.engine.next_sequence(),
            self.engine.progress().current_phase,
            document,
        );
        self.apply(&decision)
    }

    /// Claim the completion bonus for the current phase.
    pub fn claim_phase_bonus(&mut self, catalog: &EventCatalog) -> Result<TransitionOutcome, SessionError> {
        let progress = self.engine.progress();
        let decision = catalog.phase_bonus(
            self.engine.next_sequence(),
            progress.current_phase,
            &progress.completed_events,
            &progress.state.constants.sponsor_id,
        );
        self.apply(&decision)
    }

    /// Move to the next phase. No-op at the last phase; returns the phase
    /// the session is in afterwards.
    pub fn advance_phase(&mut self) -> Result<PhaseId, SessionError> {
        if let Some(decision) = self.engine.phase_advance_decision() {
            self.apply(&decision)?;
        }
        Ok(self.engine.progress().current_phase)
    }

    /// End the game and return the final report. Completing twice returns
    /// the same report without logging anything.
    pub fn complete(&mut self) -> Result<FinalReport, SessionError> {
        if !self.engine.progress().completed {
            let decision = self.engine.completion_decision();
            self.apply(&decision)?;
        }
        Ok(self.engine.report())
    }

    /// Start the session over: the stored log and snapshots are dropped.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.repository.reset(&self.session_id)?;
        self.engine.reset();
        info!(session = %self.session_id, "session reset");
        Ok(())
    }

    /// Full replay from the stored log. Swaps in an engine rebuilt from the
    /// log and returns `(state, canonical_hash)`. On error the current
    /// engine is kept.
    pub fn replay_full(&mut self) -> Result<(ProjectState, String), SessionError> {
        let events = self.repository.load_events(&self.session_id)?;
        let mode = self.options.validation;
        let scenario = self.engine.scenario().clone();
        let (progress, last_sequence) = replay::rebuild_progress(&scenario, &events, mode)?;
        self.engine = SimulationEngine::from_progress(scenario, progress, last_sequence, mode)?;
        let state = self.engine.state().clone();
        let hash = canonical_hash(&state);
        info!(session = %self.session_id, events = events.len(), hash = %hash, "session replayed");
        Ok((state, hash))
    }

    fn save_snapshot(&mut self) -> Result<(), SessionError> {
        let sequence = self.engine.last_sequence();
        let encoded = encode_snapshot(&take_snapshot(self.engine.progress(), sequence))?;
        self.repository.save_snapshot(&self.session_id, sequence, encoded)?;
        Ok(())
    }

    pub fn state(&self) -> &ProjectState {
        self.engine.state()
    }

    pub fn progress(&self) -> &GameProgress {
        self.engine.progress()
    }

    pub fn report(&self) -> FinalReport {
        self.engine.report()
    }

    pub fn current_hash(&self) -> String {
        canonical_hash(self.engine.state())
    }

    pub fn current_sequence(&self) -> u64 {
        self.engine.last_sequence()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Give the repository back, e.g. to reopen the session later.
    pub fn into_repository(self) -> R {
        self.repository
    }
}
