//! Snapshot Codec: deterministic GameProgress encoder/decoder.
//!
//! Pure codec layer. No side-effects, no timestamps, no file I/O; where a
//! snapshot is kept is the repository's business.
//!
//! - `take_snapshot`:    GameProgress → Snapshot (with canonical state hash)
//! - `encode_snapshot`:  Snapshot → JSON string
//! - `decode_snapshot`:  JSON string → Snapshot (strict, no defaults)
//! - `restore_snapshot`: decode + version, hash and invariant checks
//! - `snapshot_hash`:    SHA-256 of the encoded snapshot (lowercase hex)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use pm_sim_kernel::engine::GameProgress;
use pm_sim_kernel::hashing::canonical_hash;
use pm_sim_kernel::invariants::{validate_invariants, InvariantViolation, ValidationMode};
use pm_sim_kernel::KERNEL_VERSION;

/// All possible snapshot codec failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
    /// Malformed JSON, missing fields or unknown fields.
    #[error("snapshot deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error("snapshot was taken by kernel v{found}, this is kernel v{expected}")]
    KernelVersion { expected: u32, found: u32 },
    #[error("snapshot state hash mismatch: recorded {recorded}, computed {computed}")]
    HashMismatch { recorded: String, computed: String },
    #[error("snapshot state violates kernel invariants: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Progress captured after the decision with sequence `sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Snapshot {
    pub sequence: u64,
    pub kernel_version: u32,
    /// Canonical hash of `progress.state` at capture time.
    pub state_hash: String,
    pub progress: GameProgress,
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

pub fn take_snapshot(progress: &GameProgress, sequence: u64) -> Snapshot {
    Snapshot {
        sequence,
        kernel_version: KERNEL_VERSION,
        state_hash: canonical_hash(&progress.state),
        progress: progress.clone(),
    }
}

// ---------------------------------------------------------------------------
// Encoder / decoder
// ---------------------------------------------------------------------------

/// Encode a snapshot to a JSON string. No whitespace, deterministic output.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String, SnapshotError> {
    serde_json::to_string(snapshot).map_err(SnapshotError::Serialization)
}

/// Strict decode. `deny_unknown_fields` rejects unexpected fields; missing
/// required fields fail. No validation: use `restore_snapshot` for that.
pub fn decode_snapshot(json: &str) -> Result<Snapshot, SnapshotError> {
    serde_json::from_str::<Snapshot>(json).map_err(SnapshotError::Deserialization)
}

// ---------------------------------------------------------------------------
// Restore (decode + validate)
// ---------------------------------------------------------------------------

/// Decode and verify a snapshot before it is trusted:
///   1. kernel version matches
///   2. recorded state hash matches the decoded state
///   3. invariants hold
pub fn restore_snapshot(json: &str, mode: ValidationMode) -> Result<Snapshot, SnapshotError> {
    let snapshot = decode_snapshot(json)?;
    if snapshot.kernel_version != KERNEL_VERSION {
        return Err(SnapshotError::KernelVersion {
            expected: KERNEL_VERSION,
            found: snapshot.kernel_version,
        });
    }
    let computed = canonical_hash(&snapshot.progress.state);
    if computed != snapshot.state_hash {
        return Err(SnapshotError::HashMismatch {
            recorded: snapshot.state_hash.clone(),
            computed,
        });
    }
    validate_invariants(&snapshot.progress.state, snapshot.progress.baseline_set, mode)?;
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// SHA-256 of the encoded snapshot. Lowercase hex string.
///
/// This is the integrity hash of the whole snapshot document, not the
/// kernel's canonical state hash (which is `Snapshot::state_hash`).
pub fn snapshot_hash(snapshot: &Snapshot) -> Result<String, SnapshotError> {
    let json = encode_snapshot(snapshot)?;
    let digest = Sha256::digest(json.as_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_sim_kernel::effects::DocumentType;
    use pm_sim_kernel::engine::SimulationEngine;
    use pm_sim_kernel::events::DecisionEvent;
    use pm_sim_kernel::domain::PhaseId;
    use pm_sim_kernel::scenario::Scenario;

    fn make_progress() -> GameProgress {
        let mut engine = SimulationEngine::new(Scenario::default());
        engine
            .apply_decision(&DecisionEvent::document_completed(1, PhaseId::Initiation, DocumentType::Charter))
            .unwrap();
        engine.progress().clone()
    }

    #[test]
    fn roundtrip_produces_identical_json() {
        let snapshot = take_snapshot(&make_progress(), 1);
        let json1 = encode_snapshot(&snapshot).unwrap();
        let decoded = decode_snapshot(&json1).unwrap();
        let json2 = encode_snapshot(&decoded).unwrap();
        assert_eq!(json1, json2, "Roundtrip must produce identical JSON");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn restore_accepts_valid_snapshot() {
        let snapshot = take_snapshot(&make_progress(), 1);
        let json = encode_snapshot(&snapshot).unwrap();
        let restored = restore_snapshot(&json, ValidationMode::Strict).unwrap();
        assert_eq!(restored.progress.documents_completed(), 1);
    }

    #[test]
    fn tampered_state_returns_hash_mismatch() {
        let mut snapshot = take_snapshot(&make_progress(), 1);
        snapshot.progress.state.planned_budget = 9999;
        let json = encode_snapshot(&snapshot).unwrap();
        match restore_snapshot(&json, ValidationMode::Permissive).unwrap_err() {
            SnapshotError::HashMismatch { recorded, computed } => {
                assert_eq!(recorded, snapshot.state_hash);
                assert_ne!(recorded, computed);
            }
            other => panic!("Expected HashMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn invalid_state_returns_invariant_violation() {
        let mut progress = make_progress();
        progress.state.stakeholders[0].satisfaction = 0;
        // Hash is taken after the edit, so only the invariant check can catch it.
        let json = encode_snapshot(&take_snapshot(&progress, 1)).unwrap();
        match restore_snapshot(&json, ValidationMode::Permissive).unwrap_err() {
            SnapshotError::Invariant(violation) => {
                assert!(violation.to_string().contains("satisfaction_range"));
            }
            other => panic!("Expected Invariant, got: {:?}", other),
        }
    }

    #[test]
    fn foreign_kernel_version_rejected() {
        let mut snapshot = take_snapshot(&make_progress(), 1);
        snapshot.kernel_version = 2;
        let json = encode_snapshot(&snapshot).unwrap();
        assert!(matches!(
            restore_snapshot(&json, ValidationMode::Permissive),
            Err(SnapshotError::KernelVersion { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn corrupted_json_returns_deserialization_error() {
        let result = decode_snapshot("{ not valid json !!!}");
        assert!(matches!(result, Err(SnapshotError::Deserialization(_))));
    }

    #[test]
    fn missing_field_returns_deserialization_error() {
        let result = decode_snapshot(r#"{"sequence": 1, "kernelVersion": 1}"#);
        assert!(matches!(result, Err(SnapshotError::Deserialization(_))));
    }

    #[test]
    fn unknown_field_returns_deserialization_error() {
        let snapshot = take_snapshot(&make_progress(), 1);
        let mut value = serde_json::to_value(&snapshot).unwrap();
        value["progress"]["state"]["bonus"] = serde_json::json!(1);
        let json = serde_json::to_string(&value).unwrap();
        assert!(matches!(
            decode_snapshot(&json),
            Err(SnapshotError::Deserialization(_))
        ));
    }

    #[test]
    fn hash_is_deterministic() {
        let snapshot = take_snapshot(&make_progress(), 1);
        let h1 = snapshot_hash(&snapshot).unwrap();
        let h2 = snapshot_hash(&snapshot.clone()).unwrap();
        assert_eq!(h1, h2, "Same snapshot must produce same hash");
        assert_eq!(h1.len(), 64, "SHA-256 hex string must be 64 chars");
        assert_ne!(h1, snapshot.state_hash);
    }
}
