//! Session Repository: where sessions keep their decision logs.
//!
//! The `SessionRepository` trait is the only persistence seam; the runtime
//! ships an in-memory implementation. Events are append-only and must carry
//! strictly increasing sequence numbers (last + 1).

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use pm_sim_kernel::events::DecisionEvent;
use pm_sim_kernel::scenario::Scenario;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("unknown session {0:?}")]
    UnknownSession(String),
    #[error("session {0:?} already exists")]
    SessionExists(String),
    #[error("out-of-order append: expected sequence {expected}, got {found}")]
    OutOfOrder { expected: u64, found: u64 },
}

/// Encoded snapshot tagged with the sequence it was taken after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    pub sequence: u64,
    pub encoded: String,
}

pub trait SessionRepository {
    fn create(&mut self, session_id: &str, scenario: &Scenario) -> Result<(), RepositoryError>;
    fn scenario(&self, session_id: &str) -> Result<Scenario, RepositoryError>;
    fn append_event(&mut self, session_id: &str, event: &DecisionEvent) -> Result<(), RepositoryError>;
    fn load_events(&self, session_id: &str) -> Result<Vec<DecisionEvent>, RepositoryError>;
    /// 0 when nothing has been appended.
    fn last_sequence(&self, session_id: &str) -> Result<u64, RepositoryError>;
    fn save_snapshot(&mut self, session_id: &str, sequence: u64, encoded: String) -> Result<(), RepositoryError>;
    fn latest_snapshot(&self, session_id: &str) -> Result<Option<StoredSnapshot>, RepositoryError>;
    /// Drop all events and snapshots but keep the session and its scenario.
    fn reset(&mut self, session_id: &str) -> Result<(), RepositoryError>;
    fn delete(&mut self, session_id: &str) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
struct SessionRecord {
    scenario: Scenario,
    events: Vec<DecisionEvent>,
    snapshots: Vec<StoredSnapshot>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    sessions: BTreeMap<String, SessionRecord>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_ids(&self) -> Vec<&str> {
        self.sessions.keys().map(String::as_str).collect()
    }

    fn record(&self, session_id: &str) -> Result<&SessionRecord, RepositoryError> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| RepositoryError::UnknownSession(session_id.to_string()))
    }

    fn record_mut(&mut self, session_id: &str) -> Result<&mut SessionRecord, RepositoryError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| RepositoryError::UnknownSession(session_id.to_string()))
    }
}

impl SessionRepository for InMemoryRepository {
    fn create(&mut self, session_id: &str, scenario: &Scenario) -> Result<(), RepositoryError> {
        if self.sessions.contains_key(session_id) {
            return Err(RepositoryError::SessionExists(session_id.to_string()));
        }
        self.sessions.insert(
            session_id.to_string(),
            SessionRecord {
                scenario: scenario.clone(),
                events: Vec::new(),
                snapshots: Vec::new(),
            },
        );
        debug!(session = session_id, "session created");
        Ok(())
    }

    fn scenario(&self, session_id: &str) -> Result<Scenario, RepositoryError> {
        Ok(self.record(session_id)?.scenario.clone())
    }

    fn append_event(&mut self, session_id: &str, event: &DecisionEvent) -> Result<(), RepositoryError> {
        let record = self.record_mut(session_id)?;
        let expected = record.events.last().map_or(0, |e| e.sequence) + 1;
        if event.sequence != expected {
            return Err(RepositoryError::OutOfOrder {
                expected,
                found: event.sequence,
            });
        }
        record.events.push(event.clone());
        Ok(())
    }

    fn load_events(&self, session_id: &str) -> Result<Vec<DecisionEvent>, RepositoryError> {
        Ok(self.record(session_id)?.events.clone())
    }

    fn last_sequence(&self, session_id: &str) -> Result<u64, RepositoryError> {
        Ok(self.record(session_id)?.events.last().map_or(0, |e| e.sequence))
    }

    fn save_snapshot(&mut self, session_id: &str, sequence: u64, encoded: String) -> Result<(), RepositoryError> {
        let record = self.record_mut(session_id)?;
        record.snapshots.push(StoredSnapshot { sequence, encoded });
        debug!(session = session_id, sequence, "snapshot saved");
        Ok(())
    }

    fn latest_snapshot(&self, session_id: &str) -> Result<Option<StoredSnapshot>, RepositoryError> {
        Ok(self
            .record(session_id)?
            .snapshots
            .iter()
            .max_by_key(|s| s.sequence)
            .cloned())
    }

    fn reset(&mut self, session_id: &str) -> Result<(), RepositoryError> {
        let record = self.record_mut(session_id)?;
        record.events.clear();
        record.snapshots.clear();
        Ok(())
    }

    fn delete(&mut self, session_id: &str) -> Result<(), RepositoryError> {
        self.sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::UnknownSession(session_id.to_string()))
    }
}
