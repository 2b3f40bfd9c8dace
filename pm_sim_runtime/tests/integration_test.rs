//! Integration tests for pm_sim_runtime.
//!
//! Sessions are played from the kernel's fixture catalog and script against
//! the in-memory repository.

use pm_sim_kernel::catalog::EventCatalog;
use pm_sim_kernel::domain::{PhaseId, RiskStatus};
use pm_sim_kernel::engine::SimulationEngine;
use pm_sim_kernel::hashing::canonical_hash;
use pm_sim_kernel::invariants::ValidationMode;
use pm_sim_kernel::scenario::Scenario;
use pm_sim_kernel::scoring::Rank;
use pm_sim_kernel::script::{parse_script, run_script, ScriptStep};

use pm_sim_runtime::drift::{compare_states, first_divergence, verify_determinism};
use pm_sim_runtime::replay;
use pm_sim_runtime::repository::{InMemoryRepository, SessionRepository};
use pm_sim_runtime::session::{Session, SessionOptions};
use pm_sim_runtime::snapshot_codec::restore_snapshot;

const CATALOG: &str = include_str!("../../pm_sim_kernel/fixtures/catalog.json");
const SCRIPT: &str = include_str!("../../pm_sim_kernel/fixtures/script.json");

fn catalog() -> EventCatalog {
    EventCatalog::from_json_str(CATALOG).expect("fixture catalog")
}

fn best_path() -> Vec<ScriptStep> {
    parse_script(SCRIPT).expect("fixture script")
}

fn options(snapshot_interval: u64) -> SessionOptions {
    SessionOptions {
        snapshot_interval,
        validation: ValidationMode::Permissive,
    }
}

/// Drive a session through script steps the way a player would.
fn play(session: &mut Session<InMemoryRepository>, catalog: &EventCatalog, steps: &[ScriptStep]) {
    for step in steps {
        match step {
            ScriptStep::Choose { event_id, choice_id } => {
                session.choose(catalog, event_id, choice_id).expect("choose");
            }
            ScriptStep::Document { document } => {
                session.complete_document(*document).expect("document");
            }
            ScriptStep::Advance => {
                session.advance_phase().expect("advance");
            }
            ScriptStep::PhaseBonus => {
                session.claim_phase_bonus(catalog).expect("phase bonus");
            }
        }
    }
}

fn new_session(id: &str, snapshot_interval: u64) -> Session<InMemoryRepository> {
    Session::create(InMemoryRepository::new(), id, Scenario::default(), options(snapshot_interval))
        .expect("create session")
}

// ─────────────────────────────────────────────────────────────
// Test 1: session_matches_direct_engine
// ─────────────────────────────────────────────────────────────

#[test]
fn session_matches_direct_engine() {
    let catalog = catalog();
    let mut session = new_session("best", 5);
    play(&mut session, &catalog, &best_path());

    let mut engine = SimulationEngine::new(Scenario::default());
    run_script(&mut engine, &catalog, &best_path()).expect("run script");

    assert_eq!(session.current_hash(), canonical_hash(engine.state()));
    assert_eq!(session.current_sequence(), 19);
    assert_eq!(session.state().actual_cost, 3602);
    assert_eq!(session.state().earned_value, 3751);
}

// ─────────────────────────────────────────────────────────────
// Test 2: stored_log_replays_to_same_hash
// ─────────────────────────────────────────────────────────────

#[test]
fn stored_log_replays_to_same_hash() {
    let catalog = catalog();
    let mut session = new_session("best", 0);
    play(&mut session, &catalog, &best_path());
    let live_hash = session.current_hash();

    let events = session.repository().load_events("best").expect("load events");
    assert_eq!(events.len(), 19);
    let replayed = replay::rebuild_hash(&Scenario::default(), &events, ValidationMode::Permissive).expect("replay");
    assert_eq!(replayed, live_hash, "Replay of stored log does not match live session");

    let (state, hash) = session.replay_full().expect("replay full");
    assert_eq!(hash, live_hash);
    assert_eq!(&state, session.state());
}

// ─────────────────────────────────────────────────────────────
// Test 3: reopen_mid_game_and_finish
// ─────────────────────────────────────────────────────────────

#[test]
fn reopen_mid_game_and_finish() {
    let catalog = catalog();
    let steps = best_path();

    let mut uninterrupted = new_session("full", 4);
    play(&mut uninterrupted, &catalog, &steps);

    let mut first = new_session("split", 4);
    play(&mut first, &catalog, &steps[..7]);
    assert_eq!(first.current_sequence(), 7);
    let stored = first
        .repository()
        .latest_snapshot("split")
        .expect("snapshot lookup")
        .expect("snapshot at sequence 4");
    assert_eq!(stored.sequence, 4);

    let mut second = Session::open(first.into_repository(), "split", options(4)).expect("reopen");
    assert_eq!(second.current_sequence(), 7);
    play(&mut second, &catalog, &steps[7..]);

    assert_eq!(second.current_hash(), uninterrupted.current_hash());
    let report = second.complete().expect("complete");
    assert_eq!(report.breakdown.final_score, 96);
    assert_eq!(report.breakdown.rank, Rank::S);
}

// ─────────────────────────────────────────────────────────────
// Test 4: completed_session_reopens_completed
// ─────────────────────────────────────────────────────────────

#[test]
fn completed_session_reopens_completed() {
    let catalog = catalog();
    let mut session = new_session("done", 0);
    play(&mut session, &catalog, &best_path());
    session.complete().expect("complete");

    assert_eq!(session.current_sequence(), 20);

    let mut reopened = Session::open(session.into_repository(), "done", options(0)).expect("reopen");
    assert!(reopened.progress().completed);
    assert_eq!(reopened.progress().current_phase, PhaseId::Closing);
    assert!(reopened.claim_phase_bonus(&catalog).is_err());

    let (_, hash) = reopened.replay_full().expect("replay full");
    assert_eq!(hash, reopened.current_hash());
    assert!(reopened.progress().completed);
    assert_eq!(reopened.progress().current_phase, PhaseId::Closing);
}

// ─────────────────────────────────────────────────────────────
// Test 5: stored_snapshot_restores_and_verifies
// ─────────────────────────────────────────────────────────────

#[test]
fn stored_snapshot_restores_and_verifies() {
    let catalog = catalog();
    let mut session = new_session("snap", 19);
    play(&mut session, &catalog, &best_path());

    let stored = session
        .repository()
        .latest_snapshot("snap")
        .expect("snapshot lookup")
        .expect("snapshot");
    assert_eq!(stored.sequence, 19);
    let snapshot = restore_snapshot(&stored.encoded, ValidationMode::Strict).expect("restore");
    assert_eq!(snapshot.state_hash, session.current_hash());
    assert!(snapshot.progress.baseline_set);
    assert_eq!(snapshot.progress.documents_completed(), 6);
}

// ─────────────────────────────────────────────────────────────
// Test 6: determinism_and_drift_between_paths
// ─────────────────────────────────────────────────────────────

#[test]
fn determinism_and_drift_between_paths() {
    let catalog = catalog();
    let risky: Vec<ScriptStep> = [
        ("init-1", "init-1-b"),
        ("init-2", "init-2-b"),
        ("prereq-1", "prereq-1-b"),
        ("rom-1", "rom-1-b"),
        ("est-3", "est-3-b"),
        ("dev-1", "dev-1-b"),
        ("test-1", "test-1-b"),
    ]
    .iter()
    .map(|(event_id, choice_id)| ScriptStep::Choose {
        event_id: event_id.to_string(),
        choice_id: choice_id.to_string(),
    })
    .collect();

    let mut best = new_session("best", 0);
    play(&mut best, &catalog, &best_path());
    let mut worse = new_session("risky", 0);
    play(&mut worse, &catalog, &risky);

    let scenario = Scenario::default();
    let best_log = best.repository().load_events("best").expect("best log");
    let risky_log = worse.repository().load_events("risky").expect("risky log");

    let hash = verify_determinism(&scenario, &best_log, ValidationMode::Permissive).expect("deterministic");
    assert_eq!(hash, best.current_hash());

    assert_eq!(first_divergence(&scenario, &best_log, &best_log, ValidationMode::Permissive).expect("divergence"), None);
    assert_eq!(first_divergence(&scenario, &best_log, &risky_log, ValidationMode::Permissive).expect("divergence"), Some(1));

    let report = compare_states(best.state(), worse.state());
    assert_eq!(report.actual_cost_delta, 2752 - 3602);
    assert_eq!(report.earned_value_delta, 2852 - 3751);
    assert_eq!(report.quality_score_delta, 38 - 90);
    assert_eq!(report.risk_score_delta, 15 - 100);
    assert!(report.removed_risks.contains(&"risk-scope-creep".to_string()));
    assert!(report.added_risks.contains(&"risk-design-debt".to_string()));
    assert!(worse
        .state()
        .risks
        .iter()
        .any(|r| r.id == "risk-design-debt" && r.status == RiskStatus::Occurred));
}
